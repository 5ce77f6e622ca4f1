use leadflow_core::{Advance, CampaignKind, NewPipeline, SubmitError, Wizard, WizardStep};

/// Flag values for one `pipelines create` run.
#[derive(Debug, Clone)]
pub(crate) struct CreateInput {
    pub name: String,
    pub instruction: String,
    pub kind: CampaignKind,
    pub campaign: Option<String>,
    pub criteria: String,
    pub acknowledge_caps: bool,
}

/// Fills a wizard from the flags and walks it to the summary step.
///
/// # Errors
///
/// Returns an error naming the failing fields if a step gate rejects the
/// input, or if the outreach caps notice is shown without `--yes`.
pub(crate) fn fill_wizard(input: CreateInput) -> anyhow::Result<Wizard> {
    let mut wizard = Wizard::new();
    wizard.set_name(input.name);
    wizard.set_instruction(input.instruction);
    wizard.set_campaign_kind(input.kind);
    if let Some(campaign) = input.campaign {
        wizard.select_campaign(campaign);
    }
    wizard.set_criteria(input.criteria);

    while wizard.step() != WizardStep::Summary {
        let from = wizard.step();
        match wizard.next() {
            Ok(Advance::Moved(to)) => {
                tracing::debug!(from = from.number(), to = to.number(), "wizard step passed");
            }
            Ok(Advance::ConfirmRequired(notice)) => {
                if !input.acknowledge_caps {
                    anyhow::bail!("{}; rerun with --yes to proceed", notice.message());
                }
                println!("note: {}", notice.message());
                wizard.confirm();
            }
            Err(e) => anyhow::bail!("step {} rejected: {e}", from.number()),
        }
    }
    Ok(wizard)
}

fn print_submission(new: &NewPipeline) {
    println!("name:      {}", new.name);
    println!("kind:      {}", new.campaign_kind);
    if !new.external_campaign_id.is_empty() {
        println!("campaign:  {}", new.external_campaign_id);
    }
    if let Some(target) = new.target_lead_count {
        println!("target:    {target} leads");
    }
    println!("criteria:  {}", new.criteria);
}

/// Create a pipeline from CLI flags.
///
/// With `dry_run` the validated submission is printed and nothing is written.
///
/// # Errors
///
/// Returns an error if validation fails or the insert fails.
pub(crate) async fn run_pipelines_create(
    pool: &sqlx::PgPool,
    input: CreateInput,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mut wizard = fill_wizard(input)?;

    if dry_run {
        let new = wizard.submission()?;
        println!("dry-run: would create pipeline");
        print_submission(&new);
        return Ok(());
    }

    let created = wizard
        .submit_with(|new| async move { leadflow_db::create_pipeline(pool, &new).await })
        .await
        .map_err(|e| match e {
            SubmitError::Wizard(e) => anyhow::anyhow!(e),
            SubmitError::Persist(e) => anyhow::anyhow!("failed to create pipeline: {e}"),
        })?;

    tracing::info!(pipeline_id = %created.id, name = %created.name, "pipeline created");
    println!("created pipeline {} ({})", created.id, created.name);
    Ok(())
}
