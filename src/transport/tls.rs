use std::sync::OnceLock;

use crate::error::Error;

pub(crate) fn ensure_rustls_crypto_provider() -> Result<(), Error> {
    static INSTALLED: OnceLock<bool> = OnceLock::new();
    let installed = *INSTALLED.get_or_init(|| {
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            let _ = rustls::crypto::ring::default_provider().install_default();
        }
        rustls::crypto::CryptoProvider::get_default().is_some()
    });

    if installed {
        Ok(())
    } else {
        Err(Error::initialization("no rustls crypto provider available"))
    }
}
