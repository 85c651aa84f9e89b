use super::common::*;

use crate::workflows::admit_card::service::AdmitCardError;
use crate::workflows::admit_card::settings::{AdmitCardSettings, SignatureAuthority};

#[test]
fn defaults_apply_when_never_saved() {
    let deps = seeded_deps();
    let service = service_from(&deps);

    let settings = service.settings(&school_id());

    assert_eq!(settings, AdmitCardSettings::default());
    assert_eq!(settings.min_fee_percentage, 30);
    assert!(settings.require_fee_clearance);
    assert_eq!(settings.signature_authority, SignatureAuthority::Director);
    assert!(settings.show_photo && settings.show_signature && settings.show_seal);
}

#[test]
fn saved_settings_are_returned_and_observed() {
    let deps = seeded_deps();
    let service = service_from(&deps);
    let wanted = AdmitCardSettings {
        min_fee_percentage: 45,
        require_fee_clearance: true,
        signature_authority: SignatureAuthority::Principal,
        show_photo: false,
        show_signature: true,
        show_seal: false,
    };

    let saved = service
        .save_settings(&school_id(), wanted)
        .expect("settings persist");

    assert_eq!(saved, wanted);
    assert_eq!(service.settings(&school_id()), wanted);
}

#[test]
fn out_of_range_percentage_is_rejected_unsaved() {
    let deps = seeded_deps();
    let service = service_from(&deps);
    let broken = AdmitCardSettings {
        min_fee_percentage: 101,
        ..AdmitCardSettings::default()
    };

    let err = service
        .save_settings(&school_id(), broken)
        .expect_err("101 percent is invalid");

    assert!(matches!(err, AdmitCardError::InvalidSettings(_)));
    assert_eq!(service.settings(&school_id()), AdmitCardSettings::default());
}

#[test]
fn boundary_percentages_are_accepted() {
    let deps = seeded_deps();
    let service = service_from(&deps);

    for pct in [0, 100] {
        let settings = AdmitCardSettings {
            min_fee_percentage: pct,
            ..AdmitCardSettings::default()
        };
        service
            .save_settings(&school_id(), settings)
            .expect("0 and 100 are valid thresholds");
    }
}

#[test]
fn disabling_clearance_unlocks_an_unpaid_student() {
    let deps = seeded_deps();
    let service = service_from(&deps);
    deps.ledger
        .set_fee(&school_id(), &asha(), &annual_exam_id(), 10_000, 0);

    let gated = service.generate(&school_id(), &annual_exam_id(), &asha());
    assert!(matches!(
        gated,
        Err(AdmitCardError::NotEligible {
            min_amount_required: 3_000
        })
    ));

    service
        .save_settings(
            &school_id(),
            AdmitCardSettings {
                require_fee_clearance: false,
                ..AdmitCardSettings::default()
            },
        )
        .expect("settings persist");

    let record = service
        .generate(&school_id(), &annual_exam_id(), &asha())
        .expect("clearance disabled admits everyone");
    assert!(!record.fee_pending_at_issue);
}

#[test]
fn threshold_update_applies_to_the_next_evaluation() {
    let deps = seeded_deps();
    let service = service_from(&deps);
    deps.ledger
        .set_fee(&school_id(), &asha(), &annual_exam_id(), 10_000, 2_000);

    assert!(service
        .generate(&school_id(), &annual_exam_id(), &asha())
        .is_err());

    service
        .save_settings(
            &school_id(),
            AdmitCardSettings {
                min_fee_percentage: 20,
                ..AdmitCardSettings::default()
            },
        )
        .expect("settings persist");

    service
        .generate(&school_id(), &annual_exam_id(), &asha())
        .expect("20 percent threshold admits a 20 percent payer");
}
