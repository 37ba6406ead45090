//! Standup CLI - daily updates, performance insights and WhatsApp nudges.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::{Settings, StorageKind};
use standup_ai::{ChatModel, OpenAiClient, TaskAnalyzer};
use standup_core::{
    DailyTask, Employee, EmployeeId, FeedbackType, InsightResult, Period, TaskRecord, TimeWindow,
};
use standup_insight::{compare, InsightOutcome, InsightPipeline, PipelineConfig};
use standup_messaging::{
    weekly_report, MessageComposer, MessageKind, MessageTemplates, Notifier, WhapiClient,
    WEEKLY_REPORT_FALLBACK,
};
use standup_quality::{EvaluationContext, LlmQualityEvaluator, QualityEvaluator};
use standup_storage::{FeedbackSink, HistoryStore, JsonStorage, Storage};

#[derive(Parser)]
#[command(name = "standup")]
#[command(about = "Employee daily update tracking and performance insights", long_about = None)]
struct Cli {
    /// Data directory (overrides STANDUP_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage employees
    Employee {
        #[command(subcommand)]
        action: EmployeeCommand,
    },
    /// Record a day's planned and completed tasks
    Record {
        /// Employee ID
        employee: String,
        /// Day (YYYY-MM-DD), today by default
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Planned tasks, one per line
        #[arg(long)]
        planned: Option<String>,
        /// Completed tasks, one per line
        #[arg(long)]
        completed: Option<String>,
        /// Score the completed update and store the result
        #[arg(long)]
        evaluate: bool,
    },
    /// Compare planned and completed task lists
    Compare {
        /// Planned tasks, comma separated
        #[arg(long, value_delimiter = ',')]
        planned: Vec<String>,
        /// Completed tasks, comma separated
        #[arg(long, value_delimiter = ',')]
        completed: Vec<String>,
    },
    /// Generate and store performance insights
    Insights {
        /// Employee ID
        employee: String,
        /// Window: 1w or 1m
        #[arg(long, default_value = "1w")]
        period: Period,
    },
    /// Break a free-text update into structured tasks
    Analyze {
        /// Update text
        text: String,
        /// Store the analysis for this employee
        #[arg(long)]
        employee: Option<String>,
    },
    /// Compose a personalized message
    Message {
        /// Employee ID
        employee: String,
        /// Message kind
        #[arg(long, value_enum, default_value = "morning")]
        kind: MessageArg,
        /// Extra JSON context for feedback
        #[arg(long)]
        context: Option<String>,
        /// Window: 1w or 1m
        #[arg(long, default_value = "1w")]
        period: Period,
        /// Deliver over WhatsApp instead of printing
        #[arg(long)]
        send: bool,
    },
    /// Weekly performance report
    Report {
        /// Employee ID
        employee: String,
        /// Deliver over WhatsApp instead of printing
        #[arg(long)]
        send: bool,
    },
    /// Send the daily reminder
    Remind {
        /// Employee ID; all active employees when omitted
        employee: Option<String>,
    },
}

#[derive(Subcommand)]
enum EmployeeCommand {
    /// Register an employee
    Add {
        /// Display name
        name: String,
        /// WhatsApp number in international format
        phone: String,
    },
    /// List employees
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum MessageArg {
    /// Morning request for updates
    Morning,
    /// Performance feedback
    Feedback,
}

impl From<MessageArg> for MessageKind {
    fn from(arg: MessageArg) -> Self {
        match arg {
            MessageArg::Morning => MessageKind::MorningCheckIn,
            MessageArg::Feedback => MessageKind::PerformanceFeedback,
        }
    }
}

/// One storage handle viewed through each trait the components need.
struct Backend {
    storage: Arc<dyn Storage>,
    history: Arc<dyn HistoryStore>,
    sink: Arc<dyn FeedbackSink>,
}

impl Backend {
    fn new<S: Storage + 'static>(storage: S) -> Self {
        let storage = Arc::new(storage);
        Self {
            storage: storage.clone(),
            history: storage.clone(),
            sink: storage,
        }
    }
}

struct App {
    settings: Settings,
    backend: Backend,
}

impl App {
    fn model(&self) -> Result<Option<Arc<dyn ChatModel>>> {
        match self.settings.openai() {
            Some(config) => Ok(Some(Arc::new(OpenAiClient::new(config)?))),
            None => Ok(None),
        }
    }

    fn require_model(&self) -> Result<Arc<dyn ChatModel>> {
        self.model()?
            .context("OPENAI_API_KEY is not set; this command needs a language model")
    }

    fn pipeline(&self) -> Result<InsightPipeline> {
        let evaluator: Arc<dyn QualityEvaluator> = Arc::new(LlmQualityEvaluator::new(self.require_model()?));
        Ok(InsightPipeline::new(
            self.backend.history.clone(),
            evaluator,
            self.backend.sink.clone(),
        )
        .with_config(PipelineConfig {
            call_timeout: self.settings.call_timeout,
            ..Default::default()
        }))
    }

    /// Insight for message generation; `None` when it cannot be computed.
    async fn insight(&self, employee: &EmployeeId, window: &TimeWindow) -> Option<InsightResult> {
        let pipeline = match self.pipeline() {
            Ok(pipeline) => pipeline,
            Err(e) => {
                warn!(error = %e, "No insight pipeline, using static message");
                return None;
            }
        };
        match pipeline.run(employee, window).await {
            Ok(outcome) => Some(outcome.into_insight()),
            Err(e) => {
                warn!(error = %e, "Insight unavailable, using static message");
                None
            }
        }
    }

    fn window(&self, period: Period) -> TimeWindow {
        TimeWindow::ending_at(Utc::now(), period, &self.settings.timezone)
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.timezone).date_naive()
    }

    fn composer(&self) -> Result<MessageComposer> {
        let composer = MessageComposer::new(MessageTemplates::new());
        Ok(match self.model()? {
            Some(model) => composer.with_model(model),
            None => composer,
        })
    }

    fn notifier(&self) -> Result<Notifier> {
        let config = self
            .settings
            .whapi()
            .context("WHAPI_API_KEY is not set; cannot send WhatsApp messages")?;
        let sender = Arc::new(WhapiClient::new(config)?);
        let mut notifier = Notifier::new(self.backend.storage.clone(), sender, self.composer()?);
        if self.settings.openai_api_key.is_some() {
            notifier = notifier.with_pipeline(Arc::new(self.pipeline()?));
        }
        Ok(notifier)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    // Pure command, no storage needed
    if let Commands::Compare { planned, completed } = &cli.command {
        let metrics = compare(planned, completed);
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    let backend = open_backend(&settings).await?;
    let app = App { settings, backend };

    match cli.command {
        Commands::Employee { action } => match action {
            EmployeeCommand::Add { name, phone } => {
                let employee = Employee::new(name, phone);
                app.backend.storage.save_employee(&employee).await?;
                println!("Added employee: {} - {}", employee.id, employee.name);
            }
            EmployeeCommand::List => {
                let employees = app.backend.storage.list_employees().await?;
                println!("Employees ({})", employees.len());
                for employee in employees {
                    println!(
                        "  {} | {} | {} | {}",
                        employee.id,
                        employee.status.as_str(),
                        employee.whatsapp_number,
                        employee.name,
                    );
                }
            }
        },
        Commands::Record {
            employee,
            date,
            planned,
            completed,
            evaluate,
        } => {
            let employee = EmployeeId::from(employee);
            let date = date.unwrap_or_else(|| app.today());
            record(&app, &employee, date, planned, completed, evaluate).await?;
        }
        Commands::Compare { .. } => {}
        Commands::Insights { employee, period } => {
            let employee = EmployeeId::from(employee);
            let window = app.window(period);
            let outcome = app.pipeline()?.run(&employee, &window).await?;

            if let InsightOutcome::StoreFailed { error, .. } = &outcome {
                warn!(error = %error, "Insight computed but not stored");
            }
            println!("{}", serde_json::to_string_pretty(outcome.insight())?);
        }
        Commands::Analyze { text, employee } => {
            let analysis = TaskAnalyzer::new(app.require_model()?).analyze(&text).await?;
            let json = serde_json::to_value(&analysis)?;

            if let Some(employee) = employee {
                let receipt = app
                    .backend
                    .sink
                    .store(&EmployeeId::from(employee), FeedbackType::TaskAnalysis, &json)
                    .await?;
                info!(id = %receipt.id, "Analysis stored");
            }
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Commands::Message {
            employee,
            kind,
            context,
            period,
            send,
        } => {
            let employee = EmployeeId::from(employee);
            let window = app.window(period);
            let context = context
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                .transpose()
                .context("--context must be valid JSON")?;
            let kind = MessageKind::from(kind);

            if send {
                let notifier = app.notifier()?;
                match kind {
                    MessageKind::PerformanceFeedback => {
                        notifier
                            .send_performance_feedback(&employee, &window, context.as_ref())
                            .await?
                    }
                    _ => notifier.send_morning_check_in(&employee, &window).await?,
                };
                println!("Message sent to {employee}");
            } else {
                let insight = app.insight(&employee, &window).await;
                let message = app
                    .composer()?
                    .compose(&kind, insight.as_ref(), context.as_ref())
                    .await;
                println!("{message}");
            }
        }
        Commands::Report { employee, send } => {
            let employee = EmployeeId::from(employee);
            let window = app.window(Period::Week);
            if send {
                app.notifier()?.send_weekly_report(&employee, &window).await?;
                println!("Report sent to {employee}");
            } else {
                match app.insight(&employee, &window).await {
                    Some(insight) => print!("{}", weekly_report(&insight)),
                    None => print!("{WEEKLY_REPORT_FALLBACK}"),
                }
            }
        }
        Commands::Remind { employee } => {
            let notifier = app.notifier()?;
            let targets = match employee {
                Some(id) => vec![EmployeeId::from(id)],
                None => app
                    .backend
                    .storage
                    .list_employees()
                    .await?
                    .into_iter()
                    .filter(Employee::is_active)
                    .map(|e| e.id)
                    .collect(),
            };

            let mut sent = 0;
            for id in &targets {
                match notifier.send_daily_reminder(id).await {
                    Ok(_) => sent += 1,
                    Err(e) => warn!(employee = %id, error = %e, "Reminder not sent"),
                }
            }
            println!("Reminders sent: {sent}/{}", targets.len());
        }
    }

    Ok(())
}

async fn record(
    app: &App,
    employee: &EmployeeId,
    date: NaiveDate,
    planned: Option<String>,
    completed: Option<String>,
    evaluate: bool,
) -> Result<()> {
    let storage = &app.backend.storage;
    if storage.load_employee(employee).await?.is_none() {
        bail!("Unknown employee: {employee}");
    }

    let existing = storage.load_daily_task(employee, date).await?;
    let mut row = match (existing, planned) {
        (Some(mut row), Some(planned)) => {
            row.tasks_planned = Some(planned);
            row
        }
        (None, Some(planned)) => DailyTask::planned(employee.clone(), date, planned),
        (Some(row), None) => row,
        (None, None) => bail!("No plan recorded for {date}; pass --planned"),
    };
    if let Some(completed) = completed {
        row = row.complete(completed);
    }
    storage.save_daily_task(&row).await?;

    let record: TaskRecord = row.to_record();
    let metrics = compare(&record.tasks_planned, &record.tasks_completed);
    println!(
        "Recorded {date} for {employee}: {}/{} planned tasks done{}",
        metrics.total_completed - metrics.additional_tasks.len(),
        metrics.total_planned,
        if metrics.on_track { " (on track)" } else { "" },
    );

    if evaluate && !record.tasks_completed.is_empty() {
        let evaluator = LlmQualityEvaluator::new(app.require_model()?);
        let context = EvaluationContext::new(employee.clone(), date);
        let score = evaluator.evaluate(&record.completed_text(), &context).await?;
        app.backend
            .sink
            .store(employee, FeedbackType::ResponseQuality, &serde_json::to_value(&score)?)
            .await?;
        println!("{}", serde_json::to_string_pretty(&score)?);
    }

    Ok(())
}

async fn open_backend(settings: &Settings) -> Result<Backend> {
    match settings.storage {
        StorageKind::Json => {
            let storage = JsonStorage::new(&settings.data_dir)
                .await
                .with_context(|| format!("Failed to open {}", settings.data_dir.display()))?;
            Ok(Backend::new(storage))
        }
        StorageKind::Sqlite => open_sqlite(settings).await,
    }
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(settings: &Settings) -> Result<Backend> {
    use standup_storage::SqliteStorage;

    let storage = match &settings.database_url {
        Some(url) => SqliteStorage::new(url).await?,
        None => {
            std::fs::create_dir_all(&settings.data_dir)?;
            SqliteStorage::new_from_path(&settings.data_dir.join("standup.db")).await?
        }
    };
    Ok(Backend::new(storage))
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(_settings: &Settings) -> Result<Backend> {
    bail!("STANDUP_STORAGE=sqlite requires building with the `sqlite` feature")
}
