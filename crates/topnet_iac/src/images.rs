//! Region to machine-image mapping.

use crate::error::{IacError, IacResult};

/// Amazon Linux 2023 AMIs per region.
const AMAZON_LINUX_2023: &[(&str, &str)] = &[
    ("us-east-1", "ami-0c7217cdde317cfec"),
    ("us-east-2", "ami-0900fe555666598a2"),
    ("us-west-1", "ami-0827b6c5b977c020e"),
    ("us-west-2", "ami-0f3769c8d8429942f"),
    ("ca-central-1", "ami-0a2e7efb4257c0907"),
    ("eu-west-1", "ami-0694d931cee176e7d"),
    ("eu-central-1", "ami-0faab6bdbac9486fb"),
];

/// Resolve the machine image for a region.
///
/// A region outside the table is a hard error; silently substituting an
/// image from another region would produce a descriptor that fails at
/// apply time in a much less obvious way.
pub fn ami_for(region: &str) -> IacResult<&'static str> {
    AMAZON_LINUX_2023
        .iter()
        .find(|(r, _)| *r == region)
        .map(|(_, ami)| *ami)
        .ok_or_else(|| IacError::UnknownRegion(region.to_string()))
}
