//! Self-signed TLS for `heft serve --tls`. Certificates are pinned by
//! fingerprint on the client side rather than trusted through a CA, so the
//! only things that matter here are stable key material on disk and a
//! reproducible SHA-256 fingerprint to show the user.

use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Subject names baked into generated certificates; local-network use only.
const SUBJECT_NAMES: [&str; 3] = ["localhost", "127.0.0.1", "0.0.0.0"];

/// Make sure a certificate/key pair exists at the given paths, generating a
/// fresh self-signed pair when either file is missing. Returns the
/// certificate's SHA-256 fingerprint for display.
pub fn ensure_cert(cert_path: &Path, key_path: &Path) -> Result<String> {
    if cert_path.exists() && key_path.exists() {
        return read_fingerprint(cert_path);
    }

    eprintln!(
        "Generating self-signed TLS certificate at {}",
        cert_path.display()
    );
    let (cert_pem, key_pem, fingerprint) = new_self_signed()?;
    std::fs::write(cert_path, cert_pem)
        .with_context(|| format!("Failed to write certificate to {}", cert_path.display()))?;
    std::fs::write(key_path, key_pem)
        .with_context(|| format!("Failed to write private key to {}", key_path.display()))?;
    Ok(fingerprint)
}

/// Generate a certificate and key as PEM, plus the fingerprint of the DER
/// form (hashing the DER avoids a PEM re-parse round trip).
fn new_self_signed() -> Result<(String, String, String)> {
    let mut params =
        rcgen::CertificateParams::new(SUBJECT_NAMES.iter().map(ToString::to_string).collect::<Vec<_>>())
            .context("failed to create certificate params")?;
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, "heft self-signed");
    params
        .subject_alt_names
        .push(rcgen::SanType::IpAddress(IpAddr::V4(Ipv4Addr::LOCALHOST)));

    let key_pair = rcgen::KeyPair::generate().context("failed to generate key pair")?;
    let cert = params
        .self_signed(&key_pair)
        .context("failed to self-sign certificate")?;

    let fingerprint = fingerprint_hex(cert.der());
    Ok((cert.pem(), key_pair.serialize_pem(), fingerprint))
}

/// Fingerprint of the first certificate in an existing PEM file.
fn read_fingerprint(cert_path: &Path) -> Result<String> {
    let pem = std::fs::read(cert_path)
        .with_context(|| format!("Failed to read certificate from {}", cert_path.display()))?;
    let der = rustls_pemfile::certs(&mut pem.as_slice())
        .next()
        .context("No certificate found in PEM file")?
        .context("Malformed certificate in PEM file")?;
    Ok(fingerprint_hex(der.as_ref()))
}

/// Colon-separated uppercase hex of the SHA-256 digest, the form browsers
/// display for certificate pinning.
fn fingerprint_hex(der: &[u8]) -> String {
    Sha256::digest(der)
        .iter()
        .fold(String::with_capacity(95), |mut out, b| {
            if !out.is_empty() {
                out.push(':');
            }
            let _ = write!(out, "{b:02X}");
            out
        })
}
