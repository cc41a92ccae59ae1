use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use repasses_api::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::{financial_record::RecordType, motorcycle, user::UserRole},
    openapi::ApiDoc,
    services::{
        clients::{ClientService, CreateClientInput},
        financial::{CreateFinancialRecordInput, FinancialService},
        motorcycles::{CreateMotorcycleInput, MotorcycleService},
        users::{CreateUserInput, UserService},
    },
    storage,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde::Serialize;
use tracing::info;
use utoipa::OpenApi;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Openapi => print_openapi(),
        Commands::Migrate(args) => {
            let context = CliContext::initialize().await?;
            handle_migrate(&context, args).await
        }
        Commands::CreateUser(args) => {
            let context = CliContext::initialize().await?;
            handle_create_user(&context, args, cli.json).await
        }
        Commands::Seed => {
            let context = CliContext::initialize().await?;
            handle_seed(&context, cli.json).await
        }
    }
}

#[derive(Parser)]
#[command(name = "repasses-cli", about = "Administrative tasks for the Repasses API", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply (or roll back) the embedded migrations
    Migrate(MigrateArgs),
    /// Create a user account
    CreateUser(CreateUserArgs),
    /// Insert demo motorcycles, a client and a few ledger entries
    Seed,
    /// Print the OpenAPI document as JSON
    Openapi,
}

#[derive(Args)]
struct MigrateArgs {
    #[arg(long, action = ArgAction::SetTrue, help = "Roll back instead of applying")]
    down: bool,
    #[arg(long, help = "Number of migrations to roll back (default: all)")]
    steps: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => UserRole::User,
            RoleArg::Admin => UserRole::Admin,
        }
    }
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long, help = "Email address for the account")]
    email: String,
    #[arg(long, help = "Password (at least 6 characters)")]
    password: String,
    #[arg(long, help = "Display name")]
    name: Option<String>,
    #[arg(long, value_enum, default_value = "user", help = "Account role")]
    role: RoleArg,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }
}

#[derive(Serialize)]
struct CreatedUser {
    id: i32,
    email: String,
    name: Option<String>,
    role: UserRole,
}

#[derive(Serialize)]
struct SeedReport {
    motorcycles: usize,
    clients: usize,
    records: usize,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_openapi() -> Result<()> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}

async fn handle_migrate(context: &CliContext, args: MigrateArgs) -> Result<()> {
    if args.down {
        db::rollback_migrations(&context.db, args.steps)
            .await
            .context("failed to roll back migrations")?;
        println!("Migrations rolled back");
    } else {
        db::run_migrations(&context.db)
            .await
            .context("failed to apply migrations")?;
        println!("Migrations applied");
    }
    Ok(())
}

async fn handle_create_user(context: &CliContext, args: CreateUserArgs, json: bool) -> Result<()> {
    let service = UserService::new(context.db.clone());
    let role: UserRole = args.role.into();
    let user = service
        .create_user(CreateUserInput {
            email: Some(args.email),
            password: Some(args.password),
            role: Some(role.to_string()),
            name: args.name,
        })
        .await
        .context("failed to create user")?;

    if json {
        print_json(&CreatedUser {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        })?;
    } else {
        println!("User {} created (id {}, role {})", user.email, user.id, user.role);
    }
    Ok(())
}

fn demo_motorcycle(
    brand: &str,
    model: &str,
    year: i32,
    price: Decimal,
    mileage: i32,
    displacement: i32,
    featured: bool,
) -> CreateMotorcycleInput {
    CreateMotorcycleInput {
        brand: brand.to_string(),
        model: model.to_string(),
        year,
        color: Some("Preta".to_string()),
        mileage: Some(mileage),
        displacement: Some(displacement),
        price,
        description: Some(format!("{} {} revisada, documentação em dia", brand, model)),
        condition: Some("Excelente".to_string()),
        payment_methods: Some("À vista, PIX, financiamento".to_string()),
        features: None,
        status: None,
        is_featured: Some(featured),
        is_financed: None,
        is_overdue: None,
        is_worth_financing: None,
        finance_days_remaining: None,
        finance_monthly_payment: None,
        finance_total_remaining: None,
        thumbnail_url: None,
    }
}

async fn handle_seed(context: &CliContext, json: bool) -> Result<()> {
    let existing = motorcycle::Entity::find().count(&*context.db).await?;
    if existing > 0 {
        println!("Catalog already has {} motorcycles; skipping seed", existing);
        return Ok(());
    }

    let store = storage::from_config(&context.config);
    let motorcycles = MotorcycleService::new(context.db.clone(), store);
    let clients = ClientService::new(context.db.clone());
    let financial = FinancialService::new(context.db.clone());

    let catalog = vec![
        demo_motorcycle("Honda", "CG 160 Titan", 2022, dec!(14900), 12000, 160, true),
        demo_motorcycle("Yamaha", "Fazer 250", 2021, dec!(18500), 21000, 250, true),
        demo_motorcycle("Honda", "CB 500X", 2020, dec!(32900), 30500, 500, false),
        demo_motorcycle("Kawasaki", "Ninja 400", 2023, dec!(35990), 4200, 400, true),
    ];
    let mut created = Vec::with_capacity(catalog.len());
    for input in catalog {
        created.push(motorcycles.create_motorcycle(input).await?);
    }

    let client = clients
        .create_client(CreateClientInput {
            name: "João da Silva".to_string(),
            document: Some("123.456.789-00".to_string()),
            phone: Some("(11) 98888-7777".to_string()),
            email: Some("joao.silva@example.com".to_string()),
            address: Some("Rua das Flores, 100 - São Paulo/SP".to_string()),
            notes: None,
            reliability_score: Some(8),
        })
        .await?;

    let today = Utc::now().date_naive();
    let sold = &created[2];
    let records = vec![
        CreateFinancialRecordInput {
            record_type: RecordType::Saida,
            description: format!("Compra {} {}", sold.brand, sold.model),
            amount: dec!(27000),
            category: "Aquisição".to_string(),
            date: Some(today - Duration::days(40)),
            motorcycle_id: Some(sold.id),
            client_id: None,
        },
        CreateFinancialRecordInput {
            record_type: RecordType::Saida,
            description: "Revisão e troca de pneus".to_string(),
            amount: dec!(850),
            category: "Manutenção".to_string(),
            date: Some(today - Duration::days(20)),
            motorcycle_id: Some(sold.id),
            client_id: None,
        },
        CreateFinancialRecordInput {
            record_type: RecordType::Entrada,
            description: format!("Venda {} {}", sold.brand, sold.model),
            amount: sold.price,
            category: "Venda".to_string(),
            date: Some(today),
            motorcycle_id: Some(sold.id),
            client_id: Some(client.client.id),
        },
    ];
    let record_count = records.len();
    for input in records {
        financial.create_record(input, None).await?;
    }

    let report = SeedReport {
        motorcycles: created.len(),
        clients: 1,
        records: record_count,
    };
    info!(
        motorcycles = report.motorcycles,
        records = report.records,
        "demo data inserted"
    );
    if json {
        print_json(&report)?;
    } else {
        println!(
            "Seeded {} motorcycles, {} client and {} financial records",
            report.motorcycles, report.clients, report.records
        );
    }
    Ok(())
}
