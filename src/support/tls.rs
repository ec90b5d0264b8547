//-
// Copyright (c) 2024, The Mailcore Developers
//
// This file is part of Mailcore.
//
// Mailcore is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailcore is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mailcore. If not, see <http://www.gnu.org/licenses/>.

//! Key/certificate resolution and the SNI context cache.
//!
//! The acceptor is built around the default key pair. When a client sends a
//! server name, the servername callback swaps in a context built for that
//! host. Contexts are built once per host name and then reused.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::warn;
use openssl::pkey::{PKey, Private};
use openssl::ssl::{
    NameType, SslAcceptor, SslAcceptorBuilder, SslContext, SslMethod,
};
use openssl::x509::X509;

use crate::support::error::Error;
use crate::support::system_config::TlsConfig;

/// A private key with its certificate and intermediate chain.
pub struct KeyCert {
    pub private_key: PKey<Private>,
    pub certificate: X509,
    pub chain: Vec<X509>,
}

/// Looks up the key material to present for a given host name.
pub trait KeyCertResolver: Send + Sync {
    /// `None` requests the default key material.
    fn resolve(&self, host_name: Option<&str>) -> Result<Arc<KeyCert>, Error>;
}

/// Resolves key material from PEM files named in the TLS configuration.
pub struct FileKeyCertResolver {
    root: PathBuf,
    config: TlsConfig,
}

impl FileKeyCertResolver {
    pub fn new(root: PathBuf, config: TlsConfig) -> Self {
        FileKeyCertResolver { root, config }
    }

    fn load(&self, key: &Path, chain: &Path) -> Result<Arc<KeyCert>, Error> {
        let private_key =
            PKey::private_key_from_pem(&fs::read(self.root.join(key))?)?;
        let mut certs =
            X509::stack_from_pem(&fs::read(self.root.join(chain))?)?;
        if certs.is_empty() {
            return Err(Error::Ssl(openssl::error::ErrorStack::get()));
        }

        let certificate = certs.remove(0);
        Ok(Arc::new(KeyCert {
            private_key,
            certificate,
            chain: certs,
        }))
    }
}

impl KeyCertResolver for FileKeyCertResolver {
    fn resolve(&self, host_name: Option<&str>) -> Result<Arc<KeyCert>, Error> {
        let host = host_name.and_then(|name| {
            self.config
                .hosts
                .iter()
                .find(|&(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        });

        match host {
            Some(host) => self.load(&host.private_key, &host.certificate_chain),
            None => self.load(
                &self.config.private_key,
                &self.config.certificate_chain,
            ),
        }
    }
}

/// Caches one `SslContext` per SNI host name.
pub struct SniContextCache {
    resolver: Arc<dyn KeyCertResolver>,
    contexts: Mutex<HashMap<String, SslContext>>,
}

impl SniContextCache {
    pub fn new(resolver: Arc<dyn KeyCertResolver>) -> Self {
        SniContextCache {
            resolver,
            contexts: Mutex::new(HashMap::new()),
        }
    }

    /// Return the context for `host_name`, building it on first use.
    pub fn context_for(&self, host_name: &str) -> Result<SslContext, Error> {
        let host_name = host_name.to_ascii_lowercase();
        if let Some(ctx) = self.contexts.lock().unwrap().get(&host_name) {
            return Ok(ctx.clone());
        }

        let key_cert = self.resolver.resolve(Some(&host_name))?;
        let ctx = acceptor_builder(&key_cert)?.build().into_context();
        self.contexts
            .lock()
            .unwrap()
            .insert(host_name, ctx.clone());
        Ok(ctx)
    }
}

fn acceptor_builder(key_cert: &KeyCert) -> Result<SslAcceptorBuilder, Error> {
    let mut builder =
        SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server())?;
    builder.set_private_key(&key_cert.private_key)?;
    builder.set_certificate(&key_cert.certificate)?;
    for cert in &key_cert.chain {
        builder.add_extra_chain_cert(cert.clone())?;
    }
    builder.check_private_key()?;
    Ok(builder)
}

/// Build the acceptor used for both implicit TLS and `STARTTLS`.
pub fn create_acceptor(
    cache: Arc<SniContextCache>,
) -> Result<SslAcceptor, Error> {
    let default = cache.resolver.resolve(None)?;
    let mut builder = acceptor_builder(&default)?;
    builder.set_servername_callback(move |ssl, _alert| {
        let name = ssl.servername(NameType::HOST_NAME).map(str::to_owned);
        if let Some(name) = name {
            match cache.context_for(&name) {
                Ok(ctx) => {
                    if let Err(e) = ssl.set_ssl_context(&ctx) {
                        warn!(
                            "Failed to switch TLS context to {}: {}",
                            name, e
                        );
                    }
                }
                Err(e) => {
                    warn!("No usable key material for {}: {}", name, e);
                }
            }
        }

        Ok(())
    });
    Ok(builder.build())
}
