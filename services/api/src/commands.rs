use crate::cli::CatalogArgs;
use crate::infra::load_catalog;
use clap::Args;
use competency_import::config::AppConfig;
use competency_import::error::AppError;
use competency_import::outcomes::{
    AllocationOrder, ContextId, DescriptionFormat, FrameworkSetup, ImportError, ImportResult,
    InMemoryCatalog, OutcomeId, OutcomeImportService, ScaleConfiguration, ScaleId,
    ScaleItemSetting, ScaleSelection, ScaleSummaryEntry, SetupErrors,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScalesArgs {
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
    /// Outcome ids to summarize (defaults to every site-wide outcome)
    #[arg(long = "outcome", value_delimiter = ',')]
    pub(crate) outcomes: Vec<u64>,
}

#[derive(Args, Debug)]
pub(crate) struct ImportArgs {
    #[command(flatten)]
    pub(crate) catalog: CatalogArgs,
    /// Outcome ids to import, in selection order
    #[arg(long = "outcome", value_delimiter = ',', required = true)]
    pub(crate) outcomes: Vec<u64>,
    /// Framework short name
    #[arg(long)]
    pub(crate) shortname: String,
    /// Framework idnumber
    #[arg(long)]
    pub(crate) idnumber: String,
    /// Framework description
    #[arg(long, default_value = "")]
    pub(crate) description: String,
    /// Context to create the framework in (overrides APP_CONTEXT_ID)
    #[arg(long)]
    pub(crate) context_id: Option<u64>,
    /// Idnumber allocation order: selection or repository (overrides APP_IDNUMBER_ORDER)
    #[arg(long)]
    pub(crate) order: Option<AllocationOrder>,
    /// Scale configuration as `<scale id>=<json>`; other scales get a standard configuration
    #[arg(long = "scale-config", value_parser = parse_scale_config)]
    pub(crate) scale_configs: Vec<(ScaleId, ScaleConfiguration)>,
    /// Create the framework hidden
    #[arg(long)]
    pub(crate) hidden: bool,
    /// Print the created records as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_scale_config(raw: &str) -> Result<(ScaleId, ScaleConfiguration), String> {
    let (scale, configuration) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected '<scale id>=<json>', got '{raw}'"))?;
    let scale_id = scale
        .trim()
        .parse::<u64>()
        .map(ScaleId)
        .map_err(|err| format!("invalid scale id '{scale}' ({err})"))?;
    let configuration = ScaleConfiguration::new(configuration.trim());
    configuration
        .validate_for(scale_id)
        .map_err(|err| err.to_string())?;
    Ok((scale_id, configuration))
}

pub(crate) fn run_outcome_list(args: CatalogArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = Arc::new(load_catalog(&config.catalog, &args)?);
    let service = OutcomeImportService::new(catalog.clone(), catalog, config.import.options());

    let outcomes = service.get_all_importable_outcomes()?;
    if outcomes.is_empty() {
        println!("No site-wide outcomes available for import");
        return Ok(());
    }

    println!("Site-wide outcomes ({})", outcomes.len());
    for outcome in &outcomes {
        println!(
            "- {} | {} | {} | scale {}",
            outcome.id, outcome.shortname, outcome.fullname, outcome.scale_id
        );
    }
    Ok(())
}

pub(crate) fn run_scale_summary(args: ScalesArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = Arc::new(load_catalog(&config.catalog, &args.catalog)?);
    let service = OutcomeImportService::new(catalog.clone(), catalog, config.import.options());

    let selection: Vec<OutcomeId> = if args.outcomes.is_empty() {
        service
            .get_all_importable_outcomes()?
            .into_iter()
            .map(|outcome| outcome.id)
            .collect()
    } else {
        args.outcomes.iter().copied().map(OutcomeId).collect()
    };

    let summary = service.get_scale_summary(&selection)?;
    render_scale_summary(&summary);
    Ok(())
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = Arc::new(load_catalog(&config.catalog, &args.catalog)?);

    let mut options = config.import.options();
    if let Some(order) = args.order {
        options.idnumber_order = order;
    }
    let service = OutcomeImportService::new(catalog.clone(), catalog.clone(), options);

    let selection: Vec<OutcomeId> = args.outcomes.iter().copied().map(OutcomeId).collect();
    if !service.validate_outcomes(&selection)? {
        return Err(ImportError::InvalidSelection.into());
    }

    let summary = service.get_scale_summary(&selection)?;
    let context_id = args
        .context_id
        .map(ContextId)
        .unwrap_or(config.import.context_id);
    let setup = framework_setup(&args, context_id, &summary, &catalog)?;

    let result = service.run_import(&setup, &selection)?;
    if args.json {
        serde_json::to_writer_pretty(std::io::stdout().lock(), &result)
            .map_err(std::io::Error::from)?;
        println!();
    } else {
        render_import(&result, options.idnumber_order);
    }
    Ok(())
}

/// Uses the most used scale as the framework scale and configures the rest.
fn framework_setup(
    args: &ImportArgs,
    context_id: ContextId,
    summary: &[ScaleSummaryEntry],
    catalog: &InMemoryCatalog,
) -> Result<FrameworkSetup, ImportError> {
    let overrides: HashMap<ScaleId, &ScaleConfiguration> = args
        .scale_configs
        .iter()
        .map(|(scale_id, configuration)| (*scale_id, configuration))
        .collect();

    let selection_for = |scale_id: ScaleId| {
        let configuration = match overrides.get(&scale_id) {
            Some(configuration) => (*configuration).clone(),
            None => standard_configuration(catalog, scale_id),
        };
        ScaleSelection {
            scale_id,
            configuration,
        }
    };

    let Some((framework_scale, others)) = summary.split_first() else {
        let mut errors = SetupErrors::default();
        errors.insert("outcomes", "no outcomes with a known scale were selected");
        return Err(ImportError::Setup(errors));
    };

    Ok(FrameworkSetup {
        context_id,
        shortname: args.shortname.clone(),
        idnumber: args.idnumber.clone(),
        description: args.description.clone(),
        description_format: DescriptionFormat::Plain,
        scale: selection_for(framework_scale.scale_id),
        visible: !args.hidden,
        extra_scales: others
            .iter()
            .map(|entry| selection_for(entry.scale_id))
            .collect(),
    })
}

fn standard_configuration(catalog: &InMemoryCatalog, scale_id: ScaleId) -> ScaleConfiguration {
    match catalog.find_scale(scale_id) {
        Some(scale) => ScaleConfiguration::standard(&scale),
        None => ScaleConfiguration::build(
            scale_id,
            &[ScaleItemSetting {
                id: 1,
                scale_default: true,
                proficient: true,
            }],
        ),
    }
}

fn render_scale_summary(summary: &[ScaleSummaryEntry]) {
    if summary.is_empty() {
        println!("Scales used: none");
        return;
    }

    println!("Scales used, most used first");
    for (position, entry) in summary.iter().enumerate() {
        let marker = if position == 0 { " (framework scale)" } else { "" };
        println!(
            "- {} {}: {} outcome(s){}",
            entry.scale_id, entry.scale_name, entry.outcome_count, marker
        );
    }
}

fn render_import(result: &ImportResult, order: AllocationOrder) {
    let framework = &result.framework;
    println!(
        "Created framework {} '{}' (id {}, scale {})",
        framework.idnumber, framework.shortname, framework.id, framework.scale_id
    );
    println!("Idnumbers allocated in {order} order");

    println!("\nCompetencies ({})", result.competencies.len());
    for competency in &result.competencies {
        let scale_note = match competency.scale_id {
            Some(scale_id) => format!(" | scale {scale_id}"),
            None => String::new(),
        };
        println!(
            "- {} | {}{}",
            competency.idnumber, competency.shortname, scale_note
        );
    }
}
