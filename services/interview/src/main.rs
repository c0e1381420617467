use anyhow::{Context, Result};
use clap::Parser;
use interview_core::{
    FeedbackStatus, InterviewCategory, ParameterField, SessionWizard, Speaker, TranscriptEntry,
    TurnOutcome,
};
use interview_service::{Config, WizardFactory};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(about = "Practice a job interview against an AI interviewer")]
struct Cli {
    /// The role being interviewed for
    #[arg(long)]
    role: Option<String>,
    /// The company the interview is with
    #[arg(long)]
    company: Option<String>,
    /// behavioral, technical, system-design or hr
    #[arg(long)]
    category: Option<String>,
    /// Date of the real interview (YYYY-MM-DD)
    #[arg(long)]
    date: Option<String>,
}

type Input = Lines<BufReader<Stdin>>;

async fn prompt_line(input: &mut Input, label: &str) -> Result<Option<String>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(input.next_line().await?)
}

async fn ask_yes(input: &mut Input, question: &str) -> Result<bool> {
    let answer = prompt_line(input, &format!("{question} [Y/n] ")).await?;
    Ok(answer.is_some_and(|a| !a.trim().eq_ignore_ascii_case("n")))
}

/// Applies the CLI value for `field`, prompting until the wizard accepts one.
async fn fill_field(
    wizard: &SessionWizard,
    input: &mut Input,
    field: ParameterField,
    label: &str,
    mut value: Option<String>,
) -> Result<()> {
    loop {
        let candidate = match value.take() {
            Some(v) => v,
            None => prompt_line(input, &format!("{label}: "))
                .await?
                .context("stdin closed during setup")?,
        };
        if candidate.trim().is_empty() {
            println!("{label} is required.");
            continue;
        }
        match wizard.update_parameter(field, &candidate) {
            Ok(()) => return Ok(()),
            Err(e) => println!("{e}"),
        }
    }
}

fn print_entry(entry: &TranscriptEntry) {
    match entry.speaker {
        Speaker::Assistant => println!("\nInterviewer: {}\n", entry.text),
        Speaker::User => {}
    }
}

async fn open_interview(wizard: &SessionWizard, input: &mut Input) -> Result<bool> {
    wizard
        .start_session()
        .await
        .context("Failed to start the session")?;

    while wizard.transcript().is_empty() {
        println!("The interviewer could not be reached.");
        if !ask_yes(input, "Try again?").await? {
            return Ok(false);
        }
        if let Err(e) = wizard.retry_opening().await {
            tracing::error!("Retrying the opening failed: {}", e);
        }
    }
    for entry in wizard.transcript() {
        print_entry(&entry);
    }
    Ok(true)
}

/// Runs turns until the interviewer closes the interview or stdin ends.
async fn run_interview(wizard: &SessionWizard, input: &mut Input) -> Result<bool> {
    loop {
        let Some(line) = prompt_line(input, "You: ").await? else {
            return Ok(false);
        };
        if line.trim() == "/quit" {
            return Ok(false);
        }
        if line.trim().is_empty() {
            continue;
        }

        match wizard.exchange_turn(&line).await {
            Ok(TurnOutcome::Continue(entry)) => print_entry(&entry),
            Ok(TurnOutcome::Complete(transcript)) => {
                if let Some(closing) = transcript.last() {
                    print_entry(closing);
                }
                println!("Interview complete. Evaluating...");
                if let Err(e) = wizard.finish_session(transcript).await {
                    tracing::warn!("Feedback generation failed: {}", e);
                }
                return Ok(true);
            }
            Err(e) if e.is_remote() => {
                tracing::error!("Turn failed: {}", e);
                println!("The interviewer did not answer. Send your message again to retry.");
            }
            Err(e) => println!("{e}"),
        }
    }
}

async fn show_results(wizard: &SessionWizard, input: &mut Input) -> Result<()> {
    loop {
        match wizard.feedback_status() {
            FeedbackStatus::Ready { feedback } => {
                println!("Score: {}", feedback.score);
                println!("\nStrengths:");
                for strength in &feedback.strengths {
                    println!("  - {strength}");
                }
                println!("\nAreas to improve:");
                for improvement in &feedback.improvements {
                    println!("  - {improvement}");
                }
                println!("\n{}", feedback.summary);
                return Ok(());
            }
            FeedbackStatus::Failed { reason } => {
                println!("Feedback could not be generated: {reason}");
                if !ask_yes(input, "Retry?").await? {
                    return Ok(());
                }
                if let Err(e) = wizard.retry_feedback().await {
                    tracing::warn!("Feedback retry failed: {}", e);
                }
            }
            FeedbackStatus::Pending | FeedbackStatus::NotRequested => return Ok(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting interview service...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Build the Session ---
    let factory = WizardFactory::from_config(&config)?;
    let wizard = factory.create();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let categories = InterviewCategory::ALL.map(InterviewCategory::as_str).join(", ");
    fill_field(&wizard, &mut input, ParameterField::Role, "Role", args.role).await?;
    fill_field(&wizard, &mut input, ParameterField::CompanyName, "Company", args.company).await?;
    fill_field(
        &wizard,
        &mut input,
        ParameterField::Category,
        &format!("Interview type ({categories})"),
        args.category,
    )
    .await?;
    fill_field(
        &wizard,
        &mut input,
        ParameterField::TargetDate,
        "Interview date (YYYY-MM-DD)",
        args.date,
    )
    .await?;

    // --- 5. Run the Interview ---
    if !open_interview(&wizard, &mut input).await? {
        return Ok(());
    }
    if !run_interview(&wizard, &mut input).await? {
        tracing::info!("Interview ended before completion");
        return Ok(());
    }

    // --- 6. Show Feedback ---
    show_results(&wizard, &mut input).await
}
