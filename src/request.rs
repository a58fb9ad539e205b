//! Identity parameters for the outbound server-certificate request.

use serde::Serialize;

/// Common name, SANs, and the path-safe certificate name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityRequest {
    pub common_name:      String,
    pub sans:             Vec<String>,
    pub certificate_name: String,
}

impl IdentityRequest {
    /// Drop repeated SANs, keeping the first occurrence of each.
    pub fn dedup_sans(mut self) -> Self {
        let mut seen = Vec::with_capacity(self.sans.len());
        self.sans.retain(|san| {
            if seen.contains(san) {
                false
            } else {
                seen.push(san.clone());
                true
            }
        });
        self
    }
}

/// Build the request for this unit.
///
/// The public address is the common name; SANs are public address, private
/// address, and hostname in that order, duplicates included.  Inputs are not
/// validated.
pub fn build_identity_request(
    public_addr:   &str,
    private_addr:  &str,
    hostname:      &str,
    instance_name: &str,
) -> IdentityRequest {
    IdentityRequest {
        common_name:      public_addr.to_string(),
        sans:             vec![
            public_addr.to_string(),
            private_addr.to_string(),
            hostname.to_string(),
        ],
        certificate_name: safe_name(instance_name),
    }
}

/// Replace path separators so `name` can be used as a single path component.
pub fn safe_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}
