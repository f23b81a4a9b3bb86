//! Pastibot CLI - Command-line client for the Pastibot medication companion.

mod commands;
mod output;
mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use pastibot_api::Role;

/// Pastibot CLI - Sign in and manage medicines, patients and the dispenser robot.
#[derive(Parser)]
#[command(name = "pastibot")]
#[command(about = "Pastibot CLI for the medication companion backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

/// Account role as a command-line value.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Caregiver,
    Patient,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Caregiver => Role::Caregiver,
            RoleArg::Patient => Role::Patient,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email/password or through a browser
    Login {
        /// Email address (prompted when omitted)
        #[arg(long)]
        email: Option<String>,

        /// Sign in with Google through the browser
        #[arg(long)]
        google: bool,

        /// Role to request on a first federated sign-in
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },

    /// Create an account and sign in
    Register,

    /// Sign out and clear the stored session
    Logout,

    /// Show session state and the signed-in account
    Status,

    /// Manage the account role
    Role {
        #[command(subcommand)]
        command: RoleCommands,
    },

    /// Show or complete the account profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Manage the account password
    Password {
        #[command(subcommand)]
        command: PasswordCommands,
    },

    /// Manage linked patients (caregiver) or the caregiver link (patient)
    Patients {
        #[command(subcommand)]
        command: PatientCommands,
    },

    /// Manage medicines
    Medicines {
        #[command(subcommand)]
        command: MedicineCommands,
    },

    /// Query and control the dispenser robot
    Robot {
        #[command(subcommand)]
        command: RobotCommands,
    },

    /// Dispensation history
    History {
        /// Number of days to look back
        #[arg(long, default_value = "7")]
        days: u32,

        /// Patient ID (caregivers; defaults to the selected patient)
        #[arg(long)]
        patient_id: Option<i64>,
    },

    /// Caregiver invitations
    Invitations {
        #[command(subcommand)]
        command: InvitationCommands,
    },
}

#[derive(Subcommand)]
enum RoleCommands {
    /// Assign the account role
    Set {
        /// Role to assign
        #[arg(value_enum)]
        role: RoleArg,

        /// Caregiver's share code (required for patients)
        #[arg(long)]
        caregiver_code: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the signed-in account's profile
    Show,
    /// Complete patient onboarding
    Complete {
        /// Age in years
        #[arg(long)]
        age: Option<u32>,

        /// Medical condition (free text)
        #[arg(long)]
        condition: Option<String>,

        /// Emergency contact phone
        #[arg(long)]
        emergency_phone: Option<String>,

        /// Caregiver's share code to link with
        #[arg(long)]
        caregiver_code: Option<String>,
    },
}

#[derive(Subcommand)]
enum PasswordCommands {
    /// Set a password on a federated-only account
    Set,
    /// Request a password reset link
    Forgot {
        /// Email address (prompted when omitted)
        #[arg(long)]
        email: Option<String>,
    },
    /// Redeem a password reset token
    Reset {
        /// Reset token from the email link
        #[arg(long)]
        token: Option<String>,
    },
}

#[derive(Subcommand)]
enum PatientCommands {
    /// List linked patients
    List,
    /// Show one patient with upcoming doses and today's check-ins
    Show {
        /// Patient ID (defaults to the selected patient)
        id: Option<i64>,
    },
    /// Remember a patient for later commands
    Select {
        /// Patient ID
        id: Option<i64>,

        /// Forget the remembered patient
        #[arg(long, conflicts_with = "id")]
        clear: bool,
    },
    /// Link this patient account to a caregiver via a share code
    Link {
        /// Caregiver's share code (prompted when omitted)
        #[arg(long)]
        code: Option<String>,
    },
}

#[derive(Subcommand)]
enum MedicineCommands {
    /// List configured medicines
    List {
        /// Patient ID (caregivers; defaults to the selected patient)
        #[arg(long)]
        patient_id: Option<i64>,
    },
    /// Configure a new medicine
    Add {
        /// Medicine name
        #[arg(long)]
        name: String,

        /// Dosage description, e.g. "1 tablet"
        #[arg(long)]
        dosage: Option<String>,

        /// Intake times, comma-separated HH:MM (e.g. "08:00,20:00")
        #[arg(long)]
        times: String,

        /// Weekdays, comma-separated; omit for every day
        #[arg(long)]
        days: Option<String>,

        /// Dispenser carriage to load
        #[arg(long)]
        slot: Option<u32>,

        /// Intake instructions
        #[arg(long)]
        instructions: Option<String>,

        /// Patient ID (caregivers; defaults to the selected patient)
        #[arg(long)]
        patient_id: Option<i64>,
    },
    /// Update an existing medicine
    Update {
        /// Medicine ID
        id: i64,

        /// Medicine name
        #[arg(long)]
        name: Option<String>,

        /// Dosage description
        #[arg(long)]
        dosage: Option<String>,

        /// Intake times, comma-separated HH:MM
        #[arg(long)]
        times: Option<String>,

        /// Weekdays, comma-separated
        #[arg(long)]
        days: Option<String>,

        /// Dispenser carriage
        #[arg(long)]
        slot: Option<u32>,

        /// Intake instructions
        #[arg(long)]
        instructions: Option<String>,

        /// Patient ID (caregivers; defaults to the selected patient)
        #[arg(long)]
        patient_id: Option<i64>,
    },
    /// Remove a medicine
    Remove {
        /// Medicine ID
        id: i64,

        /// Patient ID (caregivers; defaults to the selected patient)
        #[arg(long)]
        patient_id: Option<i64>,
    },
}

#[derive(Subcommand)]
enum RobotCommands {
    /// Show robot connectivity and battery
    Status,
    /// Show loaded carriages
    Inventory,
    /// Dispense a medicine now
    Dispense {
        /// Medicine ID
        #[arg(long)]
        medicine_id: i64,

        /// Number of units (caregiver dispensing only)
        #[arg(long)]
        amount: Option<u32>,
    },
}

#[derive(Subcommand)]
enum InvitationCommands {
    /// Accept a caregiver invitation
    Accept {
        /// Invitation token
        token: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    pastibot_core::init_logging(&cli.log_level);

    let format = cli.format;
    let result = match cli.command {
        Commands::Login {
            email,
            google,
            role,
        } => {
            commands::login(
                email.as_deref(),
                google,
                role.map(Role::from),
                &format,
            )
            .await
        }
        Commands::Register => commands::register(&format).await,
        Commands::Logout => commands::logout(&format),
        Commands::Status => commands::status(&format).await,
        Commands::Role { command } => match command {
            RoleCommands::Set {
                role,
                caregiver_code,
            } => commands::role_set(role.into(), caregiver_code.as_deref(), &format).await,
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Show => commands::profile_show(&format).await,
            ProfileCommands::Complete {
                age,
                condition,
                emergency_phone,
                caregiver_code,
            } => {
                commands::profile_complete(
                    age,
                    condition.as_deref(),
                    emergency_phone.as_deref(),
                    caregiver_code.as_deref(),
                    &format,
                )
                .await
            }
        },
        Commands::Password { command } => match command {
            PasswordCommands::Set => commands::password_set(&format).await,
            PasswordCommands::Forgot { email } => {
                commands::password_forgot(email.as_deref(), &format).await
            }
            PasswordCommands::Reset { token } => {
                commands::password_reset(token.as_deref(), &format).await
            }
        },
        Commands::Patients { command } => match command {
            PatientCommands::List => commands::patients_list(&format).await,
            PatientCommands::Show { id } => commands::patients_show(id, &format).await,
            PatientCommands::Select { id, clear } => {
                commands::patients_select(id, clear, &format).await
            }
            PatientCommands::Link { code } => {
                commands::patients_link(code.as_deref(), &format).await
            }
        },
        Commands::Medicines { command } => match command {
            MedicineCommands::List { patient_id } => {
                commands::medicines_list(patient_id, &format).await
            }
            MedicineCommands::Add {
                name,
                dosage,
                times,
                days,
                slot,
                instructions,
                patient_id,
            } => {
                commands::medicines_add(
                    commands::MedicineFields {
                        name: Some(name),
                        dosage,
                        times: Some(times),
                        days,
                        slot,
                        instructions,
                    },
                    patient_id,
                    &format,
                )
                .await
            }
            MedicineCommands::Update {
                id,
                name,
                dosage,
                times,
                days,
                slot,
                instructions,
                patient_id,
            } => {
                commands::medicines_update(
                    id,
                    commands::MedicineFields {
                        name,
                        dosage,
                        times,
                        days,
                        slot,
                        instructions,
                    },
                    patient_id,
                    &format,
                )
                .await
            }
            MedicineCommands::Remove { id, patient_id } => {
                commands::medicines_remove(id, patient_id, &format).await
            }
        },
        Commands::Robot { command } => match command {
            RobotCommands::Status => commands::robot_status(&format).await,
            RobotCommands::Inventory => commands::robot_inventory(&format).await,
            RobotCommands::Dispense {
                medicine_id,
                amount,
            } => commands::robot_dispense(medicine_id, amount, &format).await,
        },
        Commands::History { days, patient_id } => {
            commands::history(days, patient_id, &format).await
        }
        Commands::Invitations { command } => match command {
            InvitationCommands::Accept { token } => {
                commands::invitations_accept(&token, &format).await
            }
        },
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}
