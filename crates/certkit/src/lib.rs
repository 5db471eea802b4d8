//! Locally-trusted TLS certificate provisioning via mkcert.
//!
//! Certificate pairs live in one directory and follow the mkcert file
//! naming convention. Provisioning is idempotent: an existing pair, or
//! a wildcard pair whose coverage includes the requested domain,
//! satisfies the request without generating anything. File modes are
//! enforced on every pass (certificates 0644, keys 0600), so drift is
//! repaired rather than reported.
//!
//! # Example
//!
//! ```no_run
//! use certkit::Provisioner;
//!
//! # fn main() -> certkit::Result<()> {
//! let provisioner = Provisioner::new("/Users/me/.config/frevo/certs".as_ref())?;
//! provisioner.install_ca()?;
//! let result = provisioner.ensure("mysite.test")?;
//! println!("serving TLS from {}", result.pair().cert.display());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod provisioner;
pub mod types;

pub use error::{Error, Result};
pub use provisioner::{Provisioned, Provisioner};
pub use types::{CertificatePair, san_names, wildcard_covers};
