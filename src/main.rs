use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use trainer_payroll::application::calculator::CompensationCalculator;
use trainer_payroll::application::conversation::Conversation;
use trainer_payroll::application::directory::Directory;
use trainer_payroll::config::Settings;
use trainer_payroll::domain::offering::SlotId;
use trainer_payroll::domain::salary::Period;
use trainer_payroll::domain::trainer::TrainerId;
use trainer_payroll::interfaces::csv::chat_reader::ChatReader;
use trainer_payroll::interfaces::csv::salary_writer::SalaryWriter;
use trainer_payroll::interfaces::roster::Roster;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Total salary of one trainer; defaults to the current month
    Salary {
        #[arg(long)]
        trainer: TrainerId,
        /// Calendar month, YYYY-MM
        #[arg(long, conflicts_with_all = ["from", "to"])]
        month: Option<String>,
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },
    /// Per-session breakdown of one trainer's salary as CSV
    Statement {
        #[arg(long)]
        trainer: TrainerId,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Salary of every trainer as CSV
    Report {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Record the headcount of a scheduled session
    Record {
        #[arg(long)]
        slot: SlotId,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        count: u32,
    },
    /// A trainer's sessions on a date
    Slots {
        #[arg(long)]
        trainer: TrainerId,
        #[arg(long)]
        date: NaiveDate,
    },
    /// Replay a CSV of chat events (actor, kind, payload) through the chat flow
    Chat {
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();
    let settings = cli.settings;

    let storage = settings.open_storage().into_diagnostic()?;
    let clock = settings.clock().into_diagnostic()?;
    let directory = Directory::new(storage.clone());
    let calculator = CompensationCalculator::new(storage, clock.clone());

    if let Some(path) = &settings.roster {
        info!("importing roster {}", path.display());
        Roster::load(path)
            .into_diagnostic()?
            .import(&directory, &calculator)
            .await
            .into_diagnostic()?;
    }

    match cli.command {
        Command::Salary {
            trainer,
            month,
            from,
            to,
        } => {
            let period = match (month, from, to) {
                (Some(month), _, _) => Period::parse_month(&month).into_diagnostic()?,
                (None, Some(from), Some(to)) => Period::new(from, to).into_diagnostic()?,
                _ => Period::month_of(clock.today()),
            };
            let statement = calculator
                .statement_for_period(trainer, period.start, period.end)
                .await
                .into_diagnostic()?;
            println!(
                "{}: {} {} for {} session(s), {}",
                statement.trainer_name,
                statement.total,
                settings.currency,
                statement.sessions.len(),
                period
            );
        }
        Command::Statement { trainer, from, to } => {
            let statement = calculator
                .statement_for_period(trainer, from, to)
                .await
                .into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = SalaryWriter::new(stdout.lock());
            writer.write_sessions(&statement).into_diagnostic()?;
        }
        Command::Report { from, to } => {
            let statements = calculator.payroll_report(from, to).await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = SalaryWriter::new(stdout.lock());
            writer.write_summary(&statements).into_diagnostic()?;
        }
        Command::Record { slot, date, count } => {
            let record = calculator
                .record_attendance(slot, date, count)
                .await
                .into_diagnostic()?;
            println!("offering {}: {}", record.offering_id, record);
        }
        Command::Slots { trainer, date } => {
            for view in directory
                .slots_for_date(trainer, date)
                .await
                .into_diagnostic()?
            {
                println!("{}\t{}", view.slot.id, view);
            }
        }
        Command::Chat { input } => {
            let conversation =
                Conversation::new(directory, calculator, clock, settings.currency.clone());
            let file = File::open(input).into_diagnostic()?;
            for event in ChatReader::new(file).events() {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        eprintln!("Error reading chat event: {}", e);
                        continue;
                    }
                };
                let actor = event.actor.clone();
                match event.into_inbound() {
                    Ok(inbound) => {
                        let reply = conversation.handle(&actor, inbound).await;
                        println!("{actor}: {}", reply.text);
                        for button in reply.buttons {
                            println!("{actor}:   [{}] {}", button.label, button.data);
                        }
                    }
                    Err(e) => eprintln!("Error processing chat event: {}", e),
                }
            }
        }
    }

    Ok(())
}
