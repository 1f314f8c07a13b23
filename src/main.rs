use std::{env, path::PathBuf, process::ExitCode};

use anyhow::{anyhow, Context, Result};
use secrecy::{ExposeSecret, SecretString};

use pestudio::api::datasets::{DatasetCreate, DatasetGenerateRequest};
use pestudio::api::evaluator::{
    ConsistencyRequest, FullReportRequest, OfflineEvaluationRequest, OptimizerRequest,
    RobustnessRequest,
};
use pestudio::api::generate::{GenerateRequest, PromptSetupRequest, TitleRequest};
use pestudio::api::orchestrator::TestArtifactRequest;
use pestudio::config::errors as config_errors;
use pestudio::events::StepStatus;
use pestudio::store::TemplateDraft;
use pestudio::{
    build_http_client, ensure_orchestration_size, open_database, parse_examples, studio_db_path,
    ApiClient, HistoryStore, OrchestrateRequest, RunController, RunStatus, SettingsStore,
    StepEvent, StudioConfig, TemplateStore,
};

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_tracing();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("pestudio: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("pestudio: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

async fn run() -> Result<()> {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        print_usage();
        return Err(anyhow!("{}: missing command", config_errors::ERR_MISSING_COMMAND));
    }
    let cmd = args.remove(0);

    let config = StudioConfig::from_env();
    let http = build_http_client();
    let api = ApiClient::new(http.clone(), config.clone());

    match cmd.as_str() {
        "generate" => generate_cmd(&api, &args).await,
        "title" => title_cmd(&api, &args).await,
        "analyze" => analyze_cmd(&api, &args).await,
        "techniques" => print_json(&api.techniques().await?.techniques),
        "models" => models_cmd(&api, &args).await,
        "orchestrate" => orchestrate_cmd(&api, http, config, &args).await,
        "artifacts" => artifacts_cmd(&api, &args).await,
        "test-artifact" => test_artifact_cmd(&api, &args).await,
        "datasets" => datasets_cmd(&api, &args).await,
        "eval" => eval_cmd(&api, &args).await,
        "templates" => templates_cmd(&args).await,
        "history" => history_cmd(&args).await,
        "settings" => settings_cmd(&api, &args).await,
        "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(anyhow!(
            "{}: unknown command '{other}'",
            config_errors::ERR_UNKNOWN_COMMAND
        )),
    }
}

fn print_usage() {
    eprintln!(
        "pestudio <command>\n\
         \n\
         Commands:\n\
         \x20 generate <prompt> [--techniques k1,k2] [--provider P] [--model M]\n\
         \x20 title <prompt-text> [--provider P] [--model M]\n\
         \x20 analyze <task-description>\n\
         \x20 techniques\n\
         \x20 models <provider>\n\
         \x20 orchestrate --task T --dataset FILE [--target-lm M] [--provider P] [--model M] [--no-stream]\n\
         \x20 artifacts [list|show <id>]\n\
         \x20 test-artifact --artifact ID --input TEXT --target-lm M\n\
         \x20 datasets <list|show|create|delete|examples|modes|generate> ...\n\
         \x20 eval <consistency|robustness|offline|full-report|optimize> ...\n\
         \x20 templates <list|show|create|use|delete> ...   (local prompt library)\n\
         \x20 history <list|show|delete|clear|stats>        (local history)\n\
         \x20 settings <show|set-theme|set-provider|set-key|backend> ..."
    );
}

/// `--flag value` style parsing over the remaining args.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|idx| args.get(idx + 1))
        .cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn positional(args: &[String], index: usize) -> Option<String> {
    args.iter()
        .filter(|a| !a.starts_with("--"))
        .nth(index)
        .cloned()
}

fn require(value: Option<String>, what: &str) -> Result<String> {
    value.ok_or_else(|| anyhow!("{}: missing {what}", config_errors::ERR_MISSING_ARG))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn stores() -> Result<(TemplateStore, HistoryStore, SettingsStore)> {
    let db = open_database(&studio_db_path()).await?;
    Ok((
        TemplateStore::new(db.clone()),
        HistoryStore::new(db.clone()),
        SettingsStore::new(db),
    ))
}

// ----------------------------------------------------------------------------
// Generation
// ----------------------------------------------------------------------------

async fn generate_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    let prompt = require(positional(args, 0), "prompt text")?;
    let (_, history, settings_store) = stores().await?;
    let settings = settings_store.load().await?;

    let provider = flag_value(args, "--provider").unwrap_or(settings.default_provider.clone());
    let model = flag_value(args, "--model").unwrap_or_else(|| "llama2".to_string());
    let techniques: Vec<String> = flag_value(args, "--techniques")
        .unwrap_or_else(|| "chain_of_thought".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let api_key = settings_store
        .api_key(&provider)
        .await?
        .map(|k| k.expose_secret().clone());

    let request = GenerateRequest {
        prompt: prompt.clone(),
        provider: provider.clone(),
        model: model.clone(),
        api_key,
        techniques: techniques.clone(),
    };
    let response = api.generate(&request).await?;

    for result in &response.results {
        println!("== {} ({} tokens) ==", result.technique_name(), result.tokens);
        println!("{}\n", result.response);
    }

    if settings.auto_save {
        let total_tokens = response.results.iter().map(|r| r.tokens).sum();
        let results = serde_json::to_value(&response.results)?;
        let id = history
            .save(&prompt, &provider, &model, &techniques, results, total_tokens)
            .await?;
        tracing::info!(generation_id = %id, "generation saved");
    }
    Ok(())
}

async fn title_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    let prompt_text = require(positional(args, 0), "prompt text")?;
    let request = TitleRequest {
        prompt_text,
        provider: flag_value(args, "--provider").unwrap_or_else(|| "local".to_string()),
        model: flag_value(args, "--model").unwrap_or_else(|| "google/flan-t5-small".to_string()),
        api_key: None,
    };
    let response = api.generate_title(&request).await?;
    println!("{}", response.title);
    Ok(())
}

async fn analyze_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    let task_description = require(positional(args, 0), "task description")?;
    let plan = api
        .analyze_prompt_setup(&PromptSetupRequest {
            task_description,
            dataset_preview_examples: None,
        })
        .await?;
    for (idx, step) in plan.steps.iter().enumerate() {
        println!("{}. {step}", idx + 1);
    }
    print_json(&plan.technique_suggestions)
}

async fn models_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    let provider = require(positional(args, 0), "provider")?;
    let response = api.list_models(&provider).await?;
    for model in response.models {
        println!("{model}");
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Orchestration
// ----------------------------------------------------------------------------

async fn orchestrate_cmd(
    api: &ApiClient,
    http: reqwest::Client,
    config: StudioConfig,
    args: &[String],
) -> Result<()> {
    let task = require(flag_value(args, "--task"), "--task")?;
    let dataset_path = require(flag_value(args, "--dataset"), "--dataset")?;
    let raw = std::fs::read_to_string(PathBuf::from(&dataset_path))
        .with_context(|| format!("read dataset {dataset_path}"))?;
    let dataset = parse_examples(&raw)?;
    ensure_orchestration_size(&dataset)?;
    tracing::info!(
        examples = dataset.len(),
        fingerprint = %pestudio::fingerprint(&dataset),
        "dataset validated"
    );

    let mut request = OrchestrateRequest::new(task, flag_value(args, "--target-lm").unwrap_or_else(|| "gpt-5-mini".to_string()), dataset);
    if let Some(provider) = flag_value(args, "--provider") {
        request.provider = provider;
    }
    if let Some(model) = flag_value(args, "--model") {
        request.model = model;
    }

    if has_flag(args, "--no-stream") {
        let result = api.orchestrate(&request).await?;
        return print_json(&result);
    }

    let controller = RunController::new(http, config);
    let mut handle = controller.start(request).await;
    println!("run {} started", handle.run_id);

    let mut rendered: Vec<StepEvent> = handle.snapshot().steps;
    for step in &rendered {
        println!("{}", format_step(step));
    }
    loop {
        let view = match handle.changed().await {
            Some(view) => view,
            None => handle.snapshot(),
        };
        for line in diff_steps(&rendered, &view.steps) {
            println!("{line}");
        }
        rendered = view.steps.clone();
        if view.status.is_terminal() {
            match view.status {
                RunStatus::Completed => {
                    println!("run completed");
                    if let Some(result) = &view.result {
                        print_json(result)?;
                    }
                }
                RunStatus::Failed => {
                    return Err(anyhow!(
                        "run failed: {}",
                        view.error.unwrap_or_else(|| "unknown error".to_string())
                    ));
                }
                _ => {}
            }
            return Ok(());
        }
    }
}

fn format_step(step: &StepEvent) -> String {
    let marker = match step.status {
        StepStatus::Pending => " ",
        StepStatus::Running => ">",
        StepStatus::Success => "+",
        StepStatus::Error => "!",
        StepStatus::Skipped => "-",
    };
    let mut line = format!("[{marker}] {} ({})", step.name, step.tool);
    if let Some(observation) = &step.observation {
        line.push_str(&format!(" — {observation}"));
    }
    if let Some(error) = &step.error {
        line.push_str(&format!(" — {error}"));
    }
    line
}

/// Lines for steps that are new or whose content changed since last render.
fn diff_steps(previous: &[StepEvent], current: &[StepEvent]) -> Vec<String> {
    current
        .iter()
        .filter(|step| {
            previous
                .iter()
                .find(|p| p.id == step.id)
                .map(|p| p != *step)
                .unwrap_or(true)
        })
        .map(format_step)
        .collect()
}

async fn artifacts_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    match positional(args, 0).as_deref() {
        None | Some("list") => {
            let response = api.artifacts().await?;
            print_json(&response.artifacts)
        }
        Some("show") => {
            let id = require(positional(args, 1), "artifact id")?;
            let detail = api.artifact(&id).await?;
            print_json(&detail.metadata)?;
            if let Some(code) = detail.program_code {
                println!("{code}");
            }
            Ok(())
        }
        Some(other) => Err(anyhow!(
            "{}: unknown artifacts action '{other}'",
            config_errors::ERR_UNKNOWN_COMMAND
        )),
    }
}

async fn test_artifact_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    let artifact_id = require(flag_value(args, "--artifact"), "--artifact")?;
    let input = require(flag_value(args, "--input"), "--input")?;
    let target_lm = require(flag_value(args, "--target-lm"), "--target-lm")?;

    let detail = api.artifact(&artifact_id).await?;
    let program_code = detail
        .program_code
        .ok_or_else(|| anyhow!("artifact {artifact_id} has no program code"))?;
    let response = api
        .test_artifact(&TestArtifactRequest {
            artifact_id,
            input,
            target_lm,
            program_code,
        })
        .await?;
    println!("{}", response.output);
    Ok(())
}

// ----------------------------------------------------------------------------
// Datasets
// ----------------------------------------------------------------------------

async fn datasets_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    match positional(args, 0).as_deref() {
        None | Some("list") => {
            let response = api.datasets().await?;
            for meta in response.datasets {
                println!("{}  {}  ({} examples, {})", meta.id, meta.name, meta.size, meta.category);
            }
            Ok(())
        }
        Some("show") => {
            let id = require(positional(args, 1), "dataset id")?;
            print_json(&api.dataset(&id).await?.dataset)
        }
        Some("create") => {
            let name = require(flag_value(args, "--name"), "--name")?;
            let file = require(flag_value(args, "--file"), "--file")?;
            let raw = std::fs::read_to_string(&file).with_context(|| format!("read {file}"))?;
            let data = parse_examples(&raw)?;
            let response = api
                .create_dataset(&DatasetCreate {
                    name,
                    description: flag_value(args, "--description").unwrap_or_default(),
                    category: flag_value(args, "--category").unwrap_or_else(|| "custom".to_string()),
                    data,
                })
                .await?;
            print_json(&response.dataset.meta)
        }
        Some("delete") => {
            let id = require(positional(args, 1), "dataset id")?;
            print_json(&api.delete_dataset(&id).await?)
        }
        Some("examples") => print_json(&api.example_datasets().await?.examples),
        Some("modes") => print_json(&api.dataset_generation_modes().await?),
        Some("generate") => {
            let task = require(flag_value(args, "--task"), "--task")?;
            let count = flag_value(args, "--count")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10);
            let mut request = DatasetGenerateRequest::from_task(task, count);
            if let Some(provider) = flag_value(args, "--provider") {
                request.provider = provider;
            }
            if let Some(model) = flag_value(args, "--model") {
                request.model = model;
            }
            print_json(&api.generate_dataset(&request).await?)
        }
        Some(other) => Err(anyhow!(
            "{}: unknown datasets action '{other}'",
            config_errors::ERR_UNKNOWN_COMMAND
        )),
    }
}

// ----------------------------------------------------------------------------
// Evaluation
// ----------------------------------------------------------------------------

async fn eval_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    let action = require(positional(args, 0), "eval action")?;
    let provider = flag_value(args, "--provider").unwrap_or_else(|| "ollama".to_string());
    let model = flag_value(args, "--model").unwrap_or_else(|| "llama2".to_string());

    let load_dataset = || -> Result<Vec<pestudio::DatasetExample>> {
        let file = require(flag_value(args, "--dataset"), "--dataset")?;
        let raw = std::fs::read_to_string(&file).with_context(|| format!("read {file}"))?;
        Ok(parse_examples(&raw)?)
    };

    let report = match action.as_str() {
        "consistency" => {
            let prompt = require(flag_value(args, "--prompt"), "--prompt")?;
            let n_samples = flag_value(args, "--samples")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            api.evaluate_consistency(&ConsistencyRequest {
                prompt,
                n_samples,
                provider,
                model,
            })
            .await?
        }
        "robustness" => {
            let prompt = require(flag_value(args, "--prompt"), "--prompt")?;
            api.evaluate_robustness(&RobustnessRequest {
                prompt,
                dataset: load_dataset()?,
                provider,
                model,
            })
            .await?
        }
        "offline" => {
            let prompts: Vec<String> = require(flag_value(args, "--prompts"), "--prompts")?
                .split("||")
                .map(|s| s.trim().to_string())
                .collect();
            api.evaluate_offline(&OfflineEvaluationRequest {
                dataset: load_dataset()?,
                prompts,
                provider,
                model,
            })
            .await?
        }
        "full-report" => {
            let prompt = require(flag_value(args, "--prompt"), "--prompt")?;
            api.full_report(&FullReportRequest {
                prompt,
                dataset: load_dataset()?,
                provider,
                model,
            })
            .await?
        }
        "optimize" => {
            let base_prompt = require(flag_value(args, "--prompt"), "--prompt")?;
            api.optimize_prompt(&OptimizerRequest {
                base_prompt,
                dataset: load_dataset()?,
                provider,
                model,
            })
            .await?
        }
        other => {
            return Err(anyhow!(
                "{}: unknown eval action '{other}'",
                config_errors::ERR_UNKNOWN_COMMAND
            ))
        }
    };
    print_json(&report)
}

// ----------------------------------------------------------------------------
// Local stores
// ----------------------------------------------------------------------------

async fn templates_cmd(args: &[String]) -> Result<()> {
    let (templates, _, _) = stores().await?;
    match positional(args, 0).as_deref() {
        None | Some("list") => {
            let listed = templates.list(flag_value(args, "--category")).await?;
            for template in listed {
                println!(
                    "{}  {}  [{}] used {} times",
                    template.id, template.name, template.category, template.usage_count
                );
            }
            Ok(())
        }
        Some("show") => {
            let id = require(positional(args, 1), "template id")?;
            print_json(&templates.get(&id).await?)
        }
        Some("create") => {
            let created = templates
                .create(TemplateDraft {
                    name: require(flag_value(args, "--name"), "--name")?,
                    prompt: require(flag_value(args, "--prompt"), "--prompt")?,
                    description: flag_value(args, "--description").unwrap_or_default(),
                    category: flag_value(args, "--category").unwrap_or_default(),
                    tags: flag_value(args, "--tags")
                        .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
                        .unwrap_or_default(),
                })
                .await?;
            print_json(&created)
        }
        Some("use") => {
            let id = require(positional(args, 1), "template id")?;
            templates.record_use(&id).await?;
            let template = templates.get(&id).await?;
            println!("{}", template.prompt);
            Ok(())
        }
        Some("delete") => {
            let id = require(positional(args, 1), "template id")?;
            if templates.delete(&id).await? {
                println!("deleted {id}");
            } else {
                println!("no template {id}");
            }
            Ok(())
        }
        Some(other) => Err(anyhow!(
            "{}: unknown templates action '{other}'",
            config_errors::ERR_UNKNOWN_COMMAND
        )),
    }
}

async fn history_cmd(args: &[String]) -> Result<()> {
    let (_, history, _) = stores().await?;
    match positional(args, 0).as_deref() {
        None | Some("list") => {
            let limit = flag_value(args, "--limit").and_then(|v| v.parse().ok());
            for record in history.list(limit).await? {
                println!(
                    "{}  {}  {}/{}  {} tokens",
                    record.id,
                    record.created_at,
                    record.provider,
                    record.model,
                    record.total_tokens
                );
            }
            Ok(())
        }
        Some("show") => {
            let id = require(positional(args, 1), "generation id")?;
            print_json(&history.get(&id).await?)
        }
        Some("delete") => {
            let id = require(positional(args, 1), "generation id")?;
            if history.delete(&id).await? {
                println!("deleted {id}");
            } else {
                println!("no generation {id}");
            }
            Ok(())
        }
        Some("clear") => {
            let removed = history.clear().await?;
            println!("removed {removed} generations");
            Ok(())
        }
        Some("stats") => print_json(&history.stats().await?),
        Some(other) => Err(anyhow!(
            "{}: unknown history action '{other}'",
            config_errors::ERR_UNKNOWN_COMMAND
        )),
    }
}

async fn settings_cmd(api: &ApiClient, args: &[String]) -> Result<()> {
    let (_, _, settings) = stores().await?;
    match positional(args, 0).as_deref() {
        None | Some("show") => {
            let current = settings.load().await?;
            print_json(&current)
        }
        Some("set-theme") => {
            let theme = require(positional(args, 1), "theme")?;
            let mut current = settings.load().await?;
            current.theme = theme;
            settings.save(&current).await?;
            Ok(())
        }
        Some("set-provider") => {
            let provider = require(positional(args, 1), "provider")?;
            let mut current = settings.load().await?;
            current.default_provider = provider;
            settings.save(&current).await?;
            Ok(())
        }
        Some("set-autosave") => {
            let value = require(positional(args, 1), "true|false")?;
            let mut current = settings.load().await?;
            current.auto_save = value == "true";
            settings.save(&current).await?;
            Ok(())
        }
        Some("set-key") => {
            let provider = require(positional(args, 1), "provider")?;
            // Key comes from the environment, not argv, so it stays out of
            // shell history and process listings.
            let key = std::env::var("PESTUDIO_API_KEY")
                .map_err(|_| anyhow!("set PESTUDIO_API_KEY with the key to store"))?;
            settings.set_api_key(&provider, SecretString::new(key)).await?;
            println!("stored key for {provider}");
            Ok(())
        }
        Some("backend") => print_json(&api.backend_settings().await?.settings),
        Some(other) => Err(anyhow!(
            "{}: unknown settings action '{other}'",
            config_errors::ERR_UNKNOWN_COMMAND
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_value_finds_pairs() {
        let a = args(&["--task", "classify", "--model", "llama2"]);
        assert_eq!(flag_value(&a, "--task").as_deref(), Some("classify"));
        assert_eq!(flag_value(&a, "--missing"), None);
    }

    #[test]
    fn positional_skips_flags() {
        let a = args(&["show", "--limit", "abc123"]);
        assert_eq!(positional(&a, 0).as_deref(), Some("show"));
        // "--limit abc123" is a flag pair, but positional parsing only skips
        // the flag itself; the CLI keeps flag values after positionals.
        assert_eq!(positional(&a, 1).as_deref(), Some("abc123"));
    }

    #[test]
    fn diff_reports_new_and_changed_steps() {
        let mut first = crate::tests_support::step("a", StepStatus::Running);
        let second = crate::tests_support::step("b", StepStatus::Running);
        let previous = vec![first.clone()];
        first.status = StepStatus::Success;
        let current = vec![first.clone(), second.clone()];
        let lines = diff_steps(&previous, &current);
        assert_eq!(lines.len(), 2);
    }
}

#[cfg(test)]
mod tests_support {
    use pestudio::events::{StepEvent, StepStatus};

    pub fn step(id: &str, status: StepStatus) -> StepEvent {
        StepEvent {
            id: id.to_string(),
            name: format!("Step {id}"),
            tool: "tool".to_string(),
            status,
            thought: None,
            action: None,
            observation: None,
            duration_ms: None,
            error: None,
            timestamp: None,
        }
    }
}
