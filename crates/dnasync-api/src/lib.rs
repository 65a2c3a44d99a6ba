// dnasync-api: Async Rust clients for Cisco DNA Center and NetBox
//
// Two API surfaces live side by side: `dnac` reads sites, devices and site
// membership from a DNA Center controller, `netbox` reads and writes the
// inventory records the reconciler manages. Both share `TransportConfig`
// for TLS and timeout handling and report failures through `Error`.

pub mod dnac;
pub mod error;
pub mod netbox;
pub mod transport;

pub use dnac::DnacClient;
pub use error::Error;
pub use netbox::NetBoxClient;
pub use transport::{TlsMode, TransportConfig};
