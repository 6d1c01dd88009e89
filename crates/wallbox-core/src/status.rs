// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of Wallbox Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Translation of the numeric `status_id` reported by the Wallbox portal.
//! The table mirrors the portal's own charger status list and must not be reordered or edited.

/// Label used for codes the portal may add later
pub const UNKNOWN_STATUS: &str = "Unknown";

pub const CHARGER_STATUS: &[(i64, &str)] = &[
    (0, "Disconnected"),
    (14, "Error"),
    (15, "Error"),
    (161, "Ready"),
    (162, "Ready"),
    (163, "Disconnected"),
    (164, "Waiting"),
    (165, "Locked"),
    (166, "Updating"),
    (177, "Scheduled"),
    (178, "Paused"),
    (179, "Scheduled"),
    (180, "Waiting for car demand"),
    (181, "Waiting for car demand"),
    (182, "Paused"),
    (183, "Waiting in queue by Power Sharing"),
    (184, "Waiting in queue by Power Sharing"),
    (185, "Waiting in queue by Power Boost"),
    (186, "Waiting in queue by Power Boost"),
    (187, "Waiting MID failed"),
    (188, "Waiting MID safety margin exceeded"),
    (189, "Waiting in queue by Eco-Smart"),
    (193, "Charging"),
    (194, "Charging"),
    (195, "Charging"),
    (196, "Discharging"),
    (209, "Locked"),
    (210, "Locked"),
];

/// Human-readable label for a charger status code
pub fn status_description(code: i64) -> &'static str {
    CHARGER_STATUS
        .iter()
        .find(|(known, _)| *known == code)
        .map_or(UNKNOWN_STATUS, |(_, label)| label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_documented_labels() {
        assert_eq!(status_description(0), "Disconnected");
        assert_eq!(status_description(14), "Error");
        assert_eq!(status_description(161), "Ready");
        assert_eq!(status_description(164), "Waiting");
        assert_eq!(status_description(166), "Updating");
        assert_eq!(status_description(178), "Paused");
        assert_eq!(status_description(181), "Waiting for car demand");
        assert_eq!(status_description(186), "Waiting in queue by Power Boost");
        assert_eq!(status_description(188), "Waiting MID safety margin exceeded");
        assert_eq!(status_description(189), "Waiting in queue by Eco-Smart");
        assert_eq!(status_description(193), "Charging");
        assert_eq!(status_description(196), "Discharging");
        assert_eq!(status_description(210), "Locked");
    }

    #[test]
    fn test_every_table_entry_round_trips() {
        for (code, label) in CHARGER_STATUS {
            assert_eq!(status_description(*code), *label, "code {code}");
        }
    }

    #[test]
    fn test_unknown_codes() {
        let known: HashSet<i64> = CHARGER_STATUS.iter().map(|(code, _)| *code).collect();
        for code in -5..=300 {
            if !known.contains(&code) {
                assert_eq!(status_description(code), UNKNOWN_STATUS, "code {code}");
            }
        }
        assert_eq!(status_description(i64::MAX), UNKNOWN_STATUS);
    }

    #[test]
    fn test_codes_are_unique() {
        let known: HashSet<i64> = CHARGER_STATUS.iter().map(|(code, _)| *code).collect();
        assert_eq!(known.len(), CHARGER_STATUS.len());
        assert_eq!(CHARGER_STATUS.len(), 28);
    }
}
