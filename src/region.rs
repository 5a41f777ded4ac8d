//! Region registry
//!
//! The offer file names regions by their console display name
//! (`US East (N. Virginia)`) while the spot feed uses its own short labels
//! (`us-east`). Both map onto the stable region code here, so the two
//! ingestors cannot drift apart.

/// One EC2 region and the names it goes by in each pricing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub code: &'static str,
    pub display_name: &'static str,
    pub spot_label: &'static str,
}

pub const REGIONS: &[Region] = &[
    Region {
        code: "gov-west-1",
        display_name: "AWS GovCloud (US)",
        spot_label: "AWS GovCloud (US)",
    },
    Region {
        code: "ap-northeast-2",
        display_name: "Asia Pacific (Seoul)",
        spot_label: "ap-northeast-2",
    },
    Region {
        code: "ap-southeast-1",
        display_name: "Asia Pacific (Singapore)",
        spot_label: "apac-sin",
    },
    Region {
        code: "ap-southeast-2",
        display_name: "Asia Pacific (Sydney)",
        spot_label: "apac-syd",
    },
    Region {
        code: "ap-northeast-1",
        display_name: "Asia Pacific (Tokyo)",
        spot_label: "apac-tokyo",
    },
    Region {
        code: "eu-central-1",
        display_name: "EU (Frankfurt)",
        spot_label: "eu-central-1",
    },
    Region {
        code: "eu-west-1",
        display_name: "EU (Ireland)",
        spot_label: "eu-ireland",
    },
    Region {
        code: "sa-east-1",
        display_name: "South America (Sao Paulo)",
        spot_label: "sa-east-1",
    },
    Region {
        code: "us-east-1",
        display_name: "US East (N. Virginia)",
        spot_label: "us-east",
    },
    Region {
        code: "us-west-1",
        display_name: "US West (N. California)",
        spot_label: "us-west",
    },
    Region {
        code: "us-west-2",
        display_name: "US West (Oregon)",
        spot_label: "us-west-2",
    },
];

/// Region code for an offer-file location name; empty when unknown.
pub fn code_for_display_name(name: &str) -> &'static str {
    REGIONS
        .iter()
        .find(|r| r.display_name == name)
        .map(|r| r.code)
        .unwrap_or("")
}

/// Region code for a spot feed label; empty when unknown.
pub fn code_for_spot_label(label: &str) -> &'static str {
    REGIONS
        .iter()
        .find(|r| r.spot_label == label)
        .map(|r| r.code)
        .unwrap_or("")
}

pub fn by_code(code: &str) -> Option<&'static Region> {
    REGIONS.iter().find(|r| r.code == code)
}
