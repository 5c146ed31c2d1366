//! Duo Admin API request signing.
//!
//! Every request carries a `Date` header and an HTTP Basic `Authorization`
//! header whose password is `hex(hmac_sha512(skey, canon))`, where `canon` is:
//!
//! ```text
//! <date>\n<METHOD>\n<host>\n<path>\n<canonical params>
//! ```
//!
//! Canonical params are sorted by key and percent-encoded, leaving only
//! `A-Z a-z 0-9 - _ . ~` unescaped.

use crate::provider::ProviderError;
use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha512;
use std::collections::BTreeMap;

type HmacSha512 = Hmac<Sha512>;

/// Request parameters; the map keeps keys sorted as the signature requires.
pub type Params = BTreeMap<String, String>;

/// RFC 2822 date, always in UTC.
#[must_use]
pub fn rfc2822_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// Encode params as `k1=v1&k2=v2`, sorted by key.
///
/// The same string is used for the signature, the query string of GET/DELETE
/// requests and the form body of POST requests.
#[must_use]
pub fn canon_params(params: &Params) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

#[must_use]
pub fn canonicalize(method: &str, host: &str, path: &str, params: &Params, date: &str) -> String {
    [
        date.to_string(),
        method.to_uppercase(),
        host.to_lowercase(),
        path.to_string(),
        canon_params(params),
    ]
    .join("\n")
}

/// Build the `Authorization` header value for a canonical request.
///
/// # Errors
/// Returns an error if the HMAC cannot be keyed with the secret key.
pub fn authorization(
    integration_key: &str,
    secret_key: &SecretString,
    canon: &str,
) -> Result<String, ProviderError> {
    let mut mac = HmacSha512::new_from_slice(secret_key.expose_secret().as_bytes())
        .map_err(|e| ProviderError::Signing(e.to_string()))?;
    mac.update(canon.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let credentials = format!("{integration_key}:{signature}");

    Ok(format!(
        "Basic {}",
        Base64::encode_string(credentials.as_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn date_is_rfc2822_with_zero_padded_day() {
        let date = Utc.with_ymd_and_hms(2012, 8, 1, 7, 9, 3).single();
        assert_eq!(
            date.map(rfc2822_date).as_deref(),
            Some("Wed, 01 Aug 2012 07:09:03 +0000")
        );
    }

    #[test]
    fn canon_params_escape_all_but_unreserved() {
        let cases = [
            ("aZ09-_.~", "aZ09-_.~"),
            ("a b", "a%20b"),
            ("a+b*c", "a%2Bb%2Ac"),
            ("user@example.com", "user%40example.com"),
            ("é", "%C3%A9"),
            ("%2D", "%252D"),
        ];
        for (raw, encoded) in cases {
            assert_eq!(
                canon_params(&params(&[("k", raw)])),
                format!("k={encoded}"),
                "{raw:?}"
            );
        }
        assert_eq!(canon_params(&params(&[("a key", "v")])), "a%20key=v");
    }

    #[test]
    fn canon_params_sorted_by_key() {
        let canon = canon_params(&params(&[
            ("username", "root"),
            ("email", "root@example.com"),
            ("realname", "First Last"),
        ]));
        assert_eq!(
            canon,
            "email=root%40example.com&realname=First%20Last&username=root"
        );
    }

    #[test]
    fn canon_params_empty() {
        assert_eq!(canon_params(&Params::new()), "");
    }

    #[test]
    fn canonicalize_normalizes_method_and_host() {
        let canon = canonicalize(
            "post",
            "API-XXXXXXXX.DuoSecurity.com",
            "/admin/v1/users",
            &params(&[("username", "root")]),
            "Tue, 21 Aug 2012 17:29:18 +0000",
        );
        assert_eq!(
            canon,
            "Tue, 21 Aug 2012 17:29:18 +0000\nPOST\napi-xxxxxxxx.duosecurity.com\n/admin/v1/users\nusername=root"
        );
    }

    #[test]
    fn authorization_is_basic_ikey_and_hex_sha512() -> Result<(), Box<dyn std::error::Error>> {
        let secret = SecretString::from("deadbeef".to_string());
        let header = authorization("DIWJ8X6AEYOR5OMC6TQ1", &secret, "canon")?;

        let encoded = header
            .strip_prefix("Basic ")
            .ok_or("missing Basic prefix")?;
        let decoded = String::from_utf8(Base64::decode_vec(encoded).map_err(|e| e.to_string())?)?;
        let (ikey, signature) = decoded.split_once(':').ok_or("missing separator")?;

        assert_eq!(ikey, "DIWJ8X6AEYOR5OMC6TQ1");
        assert_eq!(signature.len(), 128);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        Ok(())
    }

    #[test]
    fn authorization_depends_on_secret_and_canon() -> Result<(), ProviderError> {
        let a = SecretString::from("secret-a".to_string());
        let b = SecretString::from("secret-b".to_string());

        assert_eq!(
            authorization("ikey", &a, "canon")?,
            authorization("ikey", &a, "canon")?
        );
        assert_ne!(
            authorization("ikey", &a, "canon")?,
            authorization("ikey", &b, "canon")?
        );
        assert_ne!(
            authorization("ikey", &a, "canon")?,
            authorization("ikey", &a, "other")?
        );
        Ok(())
    }
}
