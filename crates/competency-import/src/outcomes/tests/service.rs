use std::sync::Arc;

use super::common::*;
use crate::outcomes::{
    AllocationOrder, DescriptionFormat, ImportError, ImportOptions, NewOutcome, OutcomeId,
    OutcomeImportService, PersistenceError, RepositoryError, ScaleId, ScaleSummaryEntry,
    Taxonomy,
};

#[test]
fn validate_outcomes_accepts_only_site_wide_selections() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");

    let oc1 = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let oc2 = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let oc3 = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let oc4 = catalog.add_outcome(NewOutcome::on_scale(scale.id).in_course(1));
    let oc5 = catalog.add_outcome(NewOutcome::on_scale(scale.id).in_course(2));

    let valid = |selection: Vec<OutcomeId>| {
        service
            .validate_outcomes(&selection)
            .expect("validation runs")
    };

    assert!(valid(ids(&[&oc1])));
    assert!(valid(ids(&[&oc1, &oc2, &oc3])));
    assert!(valid(ids(&[&oc2, &oc3])));
    assert!(!valid(ids(&[&oc4])));
    assert!(!valid(ids(&[&oc5])));
    assert!(!valid(ids(&[&oc1, &oc5])));
    assert!(!valid(ids(&[&oc1, &oc3, &oc5])));
    assert!(!valid(ids(&[&oc4, &oc5])));
}

#[test]
fn validate_outcomes_rejects_missing_ids_and_ignores_repeats() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");
    let oc1 = catalog.add_outcome(NewOutcome::on_scale(scale.id));

    assert!(service
        .validate_outcomes(&[oc1.id, oc1.id, oc1.id])
        .expect("validation runs"));
    assert!(!service
        .validate_outcomes(&[oc1.id, OutcomeId(999)])
        .expect("validation runs"));
    assert!(!service.validate_outcomes(&[]).expect("validation runs"));
}

#[test]
fn scale_summary_lists_most_used_scales_first() {
    let (service, catalog) = build_service();
    let scale1 = rating_scale(&catalog, "Scale A");
    let scale2 = rating_scale(&catalog, "Scale B");
    let scale3 = rating_scale(&catalog, "Scale C");

    let mut selection = Vec::new();
    for (scale, count) in [(&scale1, 2), (&scale2, 3), (&scale3, 4)] {
        for _ in 0..count {
            selection.push(catalog.add_outcome(NewOutcome::on_scale(scale.id)).id);
        }
    }

    let summary = service
        .get_scale_summary(&selection)
        .expect("summary builds");
    assert_eq!(
        summary,
        vec![
            ScaleSummaryEntry {
                scale_id: scale3.id,
                scale_name: "Scale C".to_string(),
                outcome_count: 4,
            },
            ScaleSummaryEntry {
                scale_id: scale2.id,
                scale_name: "Scale B".to_string(),
                outcome_count: 3,
            },
            ScaleSummaryEntry {
                scale_id: scale1.id,
                scale_name: "Scale A".to_string(),
                outcome_count: 2,
            },
        ]
    );
    let total: usize = summary.iter().map(|entry| entry.outcome_count).sum();
    assert_eq!(total, selection.len());
}

#[test]
fn importable_outcomes_exclude_course_outcomes() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");
    catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("zeta"));
    catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("alpha"));
    catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("beta").in_course(4));

    let names: Vec<String> = service
        .get_all_importable_outcomes()
        .expect("listing works")
        .into_iter()
        .map(|outcome| outcome.shortname)
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

#[test]
fn basic_import_creates_framework_and_competency() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");
    let outcome = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let setup = framework_setup(&scale, &[]);

    let result = service
        .run_import(&setup, &[outcome.id])
        .expect("import succeeds");

    let framework = &result.framework;
    assert_eq!(framework.context_id, setup.context_id);
    assert_eq!(framework.shortname, "Framework 1");
    assert_eq!(framework.idnumber, "F1");
    assert_eq!(framework.scale_id, scale.id);
    assert_eq!(framework.scale_configuration, first_item_config(scale.id));
    assert_eq!(framework.taxonomies, [Taxonomy::Competency; 4]);

    assert_eq!(result.competencies.len(), 1);
    let competency = &result.competencies[0];
    assert_eq!(competency.framework_id, framework.id);
    assert_eq!(competency.idnumber, outcome.shortname);
    assert_eq!(competency.shortname, outcome.fullname);
    assert_eq!(competency.scale_id, None);
    assert_eq!(competency.scale_configuration, None);
    assert_eq!(competency.description, outcome.description);
    assert_eq!(competency.description_format, DescriptionFormat::Plain);

    assert_eq!(catalog.frameworks().len(), 1);
    assert_eq!(catalog.competencies(framework.id), result.competencies);
}

#[test]
fn import_with_multiple_scales_keeps_foreign_scales() {
    let (service, catalog) = build_service();
    let scale1 = rating_scale(&catalog, "Scale 1");
    let scale2 = rating_scale(&catalog, "Scale 2");

    let oc1 = catalog.add_outcome(NewOutcome::on_scale(scale2.id));
    let oc2 = catalog.add_outcome(NewOutcome::on_scale(scale1.id));
    let oc3 = catalog.add_outcome(NewOutcome::on_scale(scale2.id));
    let setup = framework_setup(&scale2, &[&scale1]);

    let result = service
        .run_import(&setup, &ids(&[&oc1, &oc2, &oc3]))
        .expect("import succeeds");

    let competencies = &result.competencies;
    assert_eq!(competencies.len(), 3);
    assert_eq!(competencies[0].scale_id, None);
    assert_eq!(competencies[0].scale_configuration, None);
    assert_eq!(competencies[1].scale_id, Some(scale1.id));
    assert_eq!(
        competencies[1].scale_configuration,
        Some(first_item_config(scale1.id))
    );
    assert_eq!(competencies[2].scale_id, None);
    assert_eq!(competencies[2].scale_configuration, None);
}

#[test]
fn import_with_shared_outcome_shortnames_suffixes_ids() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");

    let oc1 = catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("OC1"));
    let oc2 = catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("OC2"));
    let oc3 = catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("OC1"));
    let oc4 = catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("OC1"));
    let oc5 = catalog.add_outcome(
        NewOutcome::on_scale(scale.id).shortname(format!("OC1_{}", oc4.id)),
    );

    let result = service
        .run_import(
            &framework_setup(&scale, &[]),
            &ids(&[&oc1, &oc2, &oc3, &oc4, &oc5]),
        )
        .expect("import succeeds");

    assert_eq!(
        idnumbers(&result.competencies),
        vec![
            "OC1".to_string(),
            "OC2".to_string(),
            format!("OC1_{}", oc3.id),
            format!("OC1_{}", oc4.id),
            format!("OC1_{}_{}", oc4.id, oc5.id),
        ]
    );
}

#[test]
fn allocation_order_decides_which_outcome_keeps_the_bare_shortname() {
    let (selection_service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");
    let older = catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("OC1"));
    let newer = catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("OC1"));
    let selection = ids(&[&newer, &older]);

    let result = selection_service
        .run_import(&framework_setup(&scale, &[]), &selection)
        .expect("selection-order import succeeds");
    assert_eq!(
        idnumbers(&result.competencies),
        vec!["OC1".to_string(), format!("OC1_{}", older.id)]
    );

    let repository_service = OutcomeImportService::new(
        catalog.clone(),
        catalog.clone(),
        ImportOptions {
            idnumber_order: AllocationOrder::Repository,
        },
    );
    let mut setup = framework_setup(&scale, &[]);
    setup.idnumber = "F2".to_string();
    let result = repository_service
        .run_import(&setup, &selection)
        .expect("repository-order import succeeds");
    assert_eq!(
        idnumbers(&result.competencies),
        vec![format!("OC1_{}", newer.id), "OC1".to_string()]
    );
}

#[test]
fn repeated_ids_are_imported_once() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");
    let oc1 = catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("A"));
    let oc2 = catalog.add_outcome(NewOutcome::on_scale(scale.id).shortname("B"));

    let result = service
        .run_import(&framework_setup(&scale, &[]), &[oc2.id, oc1.id, oc2.id])
        .expect("import succeeds");

    assert_eq!(idnumbers(&result.competencies), vec!["B", "A"]);
}

#[test]
fn failed_competency_rolls_back_the_whole_import() {
    let catalog = Arc::new(crate::outcomes::InMemoryCatalog::default());
    let store = Arc::new(FailingStore {
        inner: catalog.clone(),
        fail_on: 2,
    });
    let service = OutcomeImportService::new(catalog.clone(), store, ImportOptions::default());
    let scale = rating_scale(&catalog, "Scale");
    let oc1 = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let oc2 = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let oc3 = catalog.add_outcome(NewOutcome::on_scale(scale.id));

    let error = service
        .run_import(&framework_setup(&scale, &[]), &ids(&[&oc1, &oc2, &oc3]))
        .expect_err("second competency fails");

    assert!(matches!(
        error,
        ImportError::Persistence(PersistenceError::Unavailable(_))
    ));
    assert!(catalog.frameworks().is_empty());
}

#[test]
fn invalid_selection_is_rejected_before_persistence() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");
    let global = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let local = catalog.add_outcome(NewOutcome::on_scale(scale.id).in_course(9));

    let error = service
        .run_import(&framework_setup(&scale, &[]), &[global.id, local.id])
        .expect_err("course outcome is rejected");

    assert!(matches!(error, ImportError::InvalidSelection));
    assert!(catalog.frameworks().is_empty());
}

#[test]
fn missing_extra_scale_configuration_is_a_setup_error() {
    let (service, catalog) = build_service();
    let scale1 = rating_scale(&catalog, "Scale 1");
    let scale2 = rating_scale(&catalog, "Scale 2");
    let oc1 = catalog.add_outcome(NewOutcome::on_scale(scale1.id));
    let oc2 = catalog.add_outcome(NewOutcome::on_scale(scale1.id));
    let oc3 = catalog.add_outcome(NewOutcome::on_scale(scale2.id));
    let setup = framework_setup(&scale1, &[]);

    let errors = service
        .validate_setup(&setup, &ids(&[&oc1, &oc2, &oc3]))
        .expect("validation runs");
    let field = format!("extrascales_{}", scale2.id);
    assert!(errors.contains(&field), "unexpected errors: {errors}");

    match service.run_import(&setup, &ids(&[&oc1, &oc2, &oc3])) {
        Err(ImportError::Setup(reported)) => assert_eq!(reported, errors),
        other => panic!("expected setup error, got {other:?}"),
    }
    assert!(catalog.frameworks().is_empty());
}

#[test]
fn outcomes_on_unknown_scales_fail_setup_validation() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");
    let known = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let orphan = catalog.add_outcome(NewOutcome::on_scale(ScaleId(77)));
    let selection = ids(&[&known, &orphan]);
    let setup = framework_setup(&scale, &[]);

    let summary = service
        .get_scale_summary(&selection)
        .expect("summary builds");
    let counted: usize = summary.iter().map(|entry| entry.outcome_count).sum();
    assert!(counted < selection.len());

    let errors = service
        .validate_setup(&setup, &selection)
        .expect("validation runs");
    assert!(errors.contains("outcomes"), "unexpected errors: {errors}");

    match service.run_import(&setup, &selection) {
        Err(ImportError::Setup(reported)) => assert_eq!(reported, errors),
        other => panic!("expected setup error, got {other:?}"),
    }
    assert!(catalog.frameworks().is_empty());
}

#[test]
fn framework_idnumbers_stay_unique_across_imports() {
    let (service, catalog) = build_service();
    let scale = rating_scale(&catalog, "Scale");
    let outcome = catalog.add_outcome(NewOutcome::on_scale(scale.id));
    let setup = framework_setup(&scale, &[]);

    let first = service
        .run_import(&setup, &[outcome.id])
        .expect("first import succeeds");
    let error = service
        .run_import(&setup, &[outcome.id])
        .expect_err("second import clashes");

    assert!(matches!(
        error,
        ImportError::Persistence(PersistenceError::DuplicateFrameworkIdnumber(ref idnumber))
            if idnumber == "F1"
    ));
    assert_eq!(catalog.frameworks(), vec![first.framework]);
}

#[test]
fn repository_outages_propagate() {
    let service = OutcomeImportService::new(
        Arc::new(UnavailableRepository),
        Arc::new(crate::outcomes::InMemoryCatalog::default()),
        ImportOptions::default(),
    );

    assert!(matches!(
        service.validate_outcomes(&[OutcomeId(1)]),
        Err(ImportError::Repository(RepositoryError::Unavailable(_)))
    ));
}
