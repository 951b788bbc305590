use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use saude_core::config::core_config_from_env_values;
use saude_core::models::timestamp_from_millis;
use saude_core::repositories::accounts::SignUp;
use saude_core::screens::VitalForm;
use saude_core::settings::Palette;
use saude_core::{
    Backend, NewVital, Patient, Profile, RecordId, Recommendation, Role, ServiceResult, Session, Settings,
    Vital,
};
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "saude")]
#[command(about = "Saúde patient/doctor vitals CLI")]
struct Cli {
    /// Data directory of the files store
    #[arg(long, global = true, env = "SAUDE_DATA_DIR")]
    data_dir: Option<String>,
    /// Document store, files or memory
    #[arg(long, global = true, env = "SAUDE_STORE")]
    store: Option<String>,
    /// Output theme, light or dark
    #[arg(long, global = true, env = "SAUDE_THEME")]
    theme: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Credentials {
    /// Account email
    #[arg(long, env = "SAUDE_EMAIL")]
    email: String,
    /// Account password
    #[arg(long, env = "SAUDE_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args)]
struct Measurements {
    #[arg(long)]
    heart_rate: String,
    /// Free text such as 120/80
    #[arg(long)]
    blood_pressure: String,
    #[arg(long)]
    temperature: String,
    #[arg(long)]
    glucose: String,
    #[arg(long)]
    weight: String,
    /// Epoch milliseconds (default: now, or the current value when updating)
    #[arg(long)]
    recorded_at: Option<i64>,
}

impl Measurements {
    fn parse(&self, default_time: chrono::DateTime<Utc>) -> ServiceResult<NewVital> {
        let recorded_at = match self.recorded_at {
            Some(millis) => timestamp_from_millis(millis)?,
            None => default_time,
        };
        VitalForm {
            heart_rate: self.heart_rate.clone(),
            blood_pressure: self.blood_pressure.clone(),
            temperature: self.temperature.clone(),
            glucose: self.glucose.clone(),
            weight: self.weight.clone(),
        }
        .parse(recorded_at)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a patient or doctor account
    Signup {
        /// Display name
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "SAUDE_PASSWORD", hide_env_values = true)]
        password: String,
        /// patient or doctor
        #[arg(long, default_value = "patient")]
        role: String,
        /// Doctor's license identifier
        #[arg(long)]
        license_id: Option<String>,
        /// Doctor's specialty (repeatable)
        #[arg(long = "specialty")]
        specialties: Vec<String>,
    },
    /// Check credentials and show the account role
    Login {
        #[command(flatten)]
        auth: Credentials,
    },
    /// Link a patient to the signed-in doctor by sharing code
    Link {
        /// The patient's sharing code
        code: String,
        #[command(flatten)]
        auth: Credentials,
    },
    /// Manage vital records
    Vitals {
        #[command(subcommand)]
        command: VitalsCommand,
    },
    /// Show the vitals of every linked patient
    DoctorVitals {
        #[command(flatten)]
        auth: Credentials,
    },
    /// List the signed-in doctor's linked patients
    Patients {
        #[command(flatten)]
        auth: Credentials,
    },
    /// Send a recommendation to a linked patient
    Recommend {
        patient_id: String,
        text: String,
        #[command(flatten)]
        auth: Credentials,
    },
    /// List recommendations (default: the signed-in patient's own)
    Recommendations {
        #[arg(long)]
        patient_id: Option<String>,
        #[command(flatten)]
        auth: Credentials,
    },
}

#[derive(Subcommand)]
enum VitalsCommand {
    /// Record vitals for the signed-in patient
    Add {
        #[command(flatten)]
        measurements: Measurements,
        #[command(flatten)]
        auth: Credentials,
    },
    /// List vitals, most recent first (default: the signed-in patient's own)
    List {
        #[arg(long)]
        patient_id: Option<String>,
        #[command(flatten)]
        auth: Credentials,
    },
    /// Show one vital record
    Show {
        id: String,
        #[command(flatten)]
        auth: Credentials,
    },
    /// Replace the measurements of a vital record
    Update {
        id: String,
        #[command(flatten)]
        measurements: Measurements,
        #[command(flatten)]
        auth: Credentials,
    },
    /// Delete a vital record
    Delete {
        id: String,
        #[command(flatten)]
        auth: Credentials,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("saude_core=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'saude --help' for commands");
        return ExitCode::SUCCESS;
    };

    let setup = core_config_from_env_values(cli.data_dir, cli.store, cli.theme)
        .and_then(|cfg| Ok((Backend::from_config(&cfg)?, cfg.settings())));

    let result = match setup {
        Ok((backend, settings)) => run(&backend, stdout_palette(settings), command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// The theme's palette, or a plain one when stdout is piped or redirected.
fn stdout_palette(settings: Settings) -> Palette {
    let palette = settings.theme.palette();
    if std::io::stdout().is_terminal() {
        palette
    } else {
        palette.plain()
    }
}

async fn run(backend: &Backend, palette: Palette, command: Commands) -> ServiceResult<()> {
    match command {
        Commands::Signup {
            name,
            email,
            password,
            role,
            license_id,
            specialties,
        } => {
            let role: Role = role.parse()?;
            let (session, profile) = backend
                .accounts
                .sign_up(SignUp {
                    name,
                    email,
                    password,
                    role,
                    license_id,
                    specialties: Some(specialties),
                })
                .await?;
            println!(
                "Created {} account {}",
                profile.role(),
                session.account_id()
            );
            if let Profile::Patient(patient) = &profile {
                println!("Sharing code: {}", patient.sharing_code);
            }
            backend.accounts.logout(&session).await
        }
        Commands::Login { auth } => {
            let (session, role) = backend.accounts.login(&auth.email, &auth.password).await?;
            println!("Signed in as {} ({})", session.account_id(), role);
            backend.accounts.logout(&session).await
        }
        Commands::Link { code, auth } => {
            with_session(backend, &auth, |session| async move {
                let patient_id = backend.linking.link_patient(&session, &code).await?;
                println!("Linked patient {}", patient_id);
                Ok(())
            })
            .await
        }
        Commands::Vitals { command } => run_vitals(backend, palette, command).await,
        Commands::DoctorVitals { auth } => {
            with_session(backend, &auth, |session| async move {
                let by_patient = backend.vitals.vitals_for_doctor(&session).await?;
                if by_patient.is_empty() {
                    println!("No linked patients.");
                }
                for (patient_id, vitals) in by_patient {
                    println!("{}", palette.heading(&format!("Patient {patient_id}")));
                    print_vitals(palette, &vitals);
                }
                Ok(())
            })
            .await
        }
        Commands::Patients { auth } => {
            with_session(backend, &auth, |session| async move {
                let patients = backend.linking.linked_patients(&session).await?;
                if patients.is_empty() {
                    println!("No linked patients.");
                }
                for patient in &patients {
                    print_patient(palette, patient);
                }
                Ok(())
            })
            .await
        }
        Commands::Recommend {
            patient_id,
            text,
            auth,
        } => {
            with_session(backend, &auth, |session| async move {
                let patient_id = RecordId::parse(&patient_id)?;
                let sent = backend
                    .recommendations
                    .send_recommendation(&session, &patient_id, &text)
                    .await?;
                println!("Sent recommendation {}", sent.id);
                Ok(())
            })
            .await
        }
        Commands::Recommendations { patient_id, auth } => {
            with_session(backend, &auth, |session| async move {
                let patient_id = target_patient(backend, &session, patient_id).await?;
                let recommendations = backend
                    .recommendations
                    .recommendations_for_patient(&patient_id)
                    .await?;
                if recommendations.is_empty() {
                    println!("No recommendations.");
                }
                for recommendation in &recommendations {
                    print_recommendation(palette, recommendation);
                }
                Ok(())
            })
            .await
        }
    }
}

async fn run_vitals(backend: &Backend, palette: Palette, command: VitalsCommand) -> ServiceResult<()> {
    match command {
        VitalsCommand::Add { measurements, auth } => {
            with_session(backend, &auth, |session| async move {
                let vital = backend
                    .vitals
                    .add_vital(&session, measurements.parse(Utc::now())?)
                    .await?;
                println!("Recorded vital {}", vital.id);
                Ok(())
            })
            .await
        }
        VitalsCommand::List { patient_id, auth } => {
            with_session(backend, &auth, |session| async move {
                let patient_id = target_patient(backend, &session, patient_id).await?;
                let vitals = backend.vitals.vitals_for_patient(&patient_id).await?;
                print_vitals(palette, &vitals);
                Ok(())
            })
            .await
        }
        VitalsCommand::Show { id, auth } => {
            with_session(backend, &auth, |session| async move {
                let vital = backend
                    .access
                    .read_vital(&session, &RecordId::parse(&id)?)
                    .await?;
                print_vital(palette, &vital);
                Ok(())
            })
            .await
        }
        VitalsCommand::Update {
            id,
            measurements,
            auth,
        } => {
            with_session(backend, &auth, |session| async move {
                let existing = backend
                    .access
                    .own_vital(&session, &RecordId::parse(&id)?)
                    .await?;
                let new = measurements.parse(existing.recorded_at)?;
                let updated = existing.with_measurements(new);
                backend.vitals.update_vital(&updated).await?;
                println!("Updated vital {}", updated.id);
                Ok(())
            })
            .await
        }
        VitalsCommand::Delete { id, auth } => {
            with_session(backend, &auth, |session| async move {
                let vital = backend
                    .access
                    .own_vital(&session, &RecordId::parse(&id)?)
                    .await?;
                backend.vitals.delete_vital(&vital.id).await?;
                println!("Deleted vital {}", vital.id);
                Ok(())
            })
            .await
        }
    }
}

/// Signs in, runs `f` with the session and signs out again, whatever `f` returned.
async fn with_session<F, Fut>(backend: &Backend, auth: &Credentials, f: F) -> ServiceResult<()>
where
    F: FnOnce(Session) -> Fut,
    Fut: std::future::Future<Output = ServiceResult<()>>,
{
    let (session, _) = backend.accounts.login(&auth.email, &auth.password).await?;
    let result = f(session.clone()).await;
    backend.accounts.logout(&session).await?;
    result
}

/// The explicit `--patient-id`, or the signed-in account when omitted.
///
/// Reading another patient's data requires a linked doctor.
async fn target_patient(
    backend: &Backend,
    session: &Session,
    patient_id: Option<String>,
) -> ServiceResult<RecordId> {
    let patient_id = match patient_id {
        Some(raw) => RecordId::parse(&raw)?,
        None => session.account_id().clone(),
    };
    backend.access.read_patient(session, &patient_id).await?;
    Ok(patient_id)
}

fn print_patient(palette: Palette, patient: &Patient) {
    println!(
        "{} {}",
        palette.heading(&patient.name),
        palette.muted(&format!("{} <{}>", patient.id, patient.email))
    );
}

fn print_vital(palette: Palette, vital: &Vital) {
    println!(
        "{} HR {} bpm, BP {}, {:.1} °C, glucose {} mg/dL, {:.1} kg {}",
        palette.heading(&vital.recorded_at.format("%Y-%m-%d %H:%M").to_string()),
        vital.heart_rate,
        vital.blood_pressure,
        vital.temperature,
        vital.glucose,
        vital.weight,
        palette.muted(&vital.id.to_string())
    );
}

fn print_vitals(palette: Palette, vitals: &[Vital]) {
    if vitals.is_empty() {
        println!("{}", palette.muted("No vitals recorded."));
    }
    for vital in vitals {
        print_vital(palette, vital);
    }
}

fn print_recommendation(palette: Palette, recommendation: &Recommendation) {
    println!(
        "{} {}",
        palette.heading(&recommendation.sent_at.format("%Y-%m-%d %H:%M").to_string()),
        recommendation.text
    );
    println!(
        "  {}",
        palette.muted(&format!("from doctor {}", recommendation.doctor_id))
    );
}
