use sea_orm::DatabaseBackend;
use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_motorcycles_table::Migration),
            Box::new(m20240101_000003_create_motorcycle_images_table::Migration),
            Box::new(m20240101_000004_create_clients_table::Migration),
            Box::new(m20240101_000005_create_financial_records_table::Migration),
        ]
    }
}

/// Money column. SQLite gets REAL affinity so stored amounts always decode as floats.
fn money(manager: &SchemaManager, col: impl IntoIden) -> ColumnDef {
    let mut def = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => def.double(),
        _ => def.decimal_len(12, 2),
    };
    def
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    PasswordHash,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Motorcycles {
    Table,
    Id,
    Brand,
    Model,
    Year,
    Color,
    Mileage,
    Displacement,
    Price,
    Description,
    Condition,
    PaymentMethods,
    Features,
    IsFeatured,
    IsFinanced,
    IsOverdue,
    IsWorthFinancing,
    FinanceDaysRemaining,
    FinanceMonthlyPayment,
    FinanceTotalRemaining,
    ThumbnailUrl,
    Status,
    SoldAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum MotorcycleImages {
    Table,
    Id,
    MotorcycleId,
    ImageUrl,
    StorageKey,
    DisplayOrder,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
    Name,
    Document,
    Phone,
    Email,
    Address,
    Notes,
    ReliabilityScore,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum FinancialRecords {
    Table,
    Id,
    Type,
    Description,
    Amount,
    Category,
    Date,
    MotorcycleId,
    ClientId,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

mod m20240101_000001_create_users_table {
    use super::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Name).string_len(255).null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(16)
                                .not_null()
                                .default("user"),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000002_create_motorcycles_table {
    use super::{money, Motorcycles};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_motorcycles_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Motorcycles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Motorcycles::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Motorcycles::Brand).string_len(100).not_null())
                        .col(ColumnDef::new(Motorcycles::Model).string_len(100).not_null())
                        .col(ColumnDef::new(Motorcycles::Year).integer().not_null())
                        .col(ColumnDef::new(Motorcycles::Color).string_len(50).null())
                        .col(ColumnDef::new(Motorcycles::Mileage).integer().null())
                        .col(ColumnDef::new(Motorcycles::Displacement).integer().null())
                        .col(
                            money(manager, Motorcycles::Price)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Motorcycles::Description).text().null())
                        .col(ColumnDef::new(Motorcycles::Condition).string_len(50).null())
                        .col(ColumnDef::new(Motorcycles::PaymentMethods).text().null())
                        .col(ColumnDef::new(Motorcycles::Features).text().null())
                        .col(
                            ColumnDef::new(Motorcycles::IsFeatured)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Motorcycles::IsFinanced)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Motorcycles::IsOverdue)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Motorcycles::IsWorthFinancing)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Motorcycles::FinanceDaysRemaining)
                                .integer()
                                .null(),
                        )
                        .col(
                            money(manager, Motorcycles::FinanceMonthlyPayment)
                                .null(),
                        )
                        .col(
                            money(manager, Motorcycles::FinanceTotalRemaining)
                                .null(),
                        )
                        .col(ColumnDef::new(Motorcycles::ThumbnailUrl).text().null())
                        .col(
                            ColumnDef::new(Motorcycles::Status)
                                .string_len(16)
                                .not_null()
                                .default("disponivel"),
                        )
                        .col(
                            ColumnDef::new(Motorcycles::SoldAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Motorcycles::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Motorcycles::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_motorcycles_status")
                        .table(Motorcycles::Table)
                        .col(Motorcycles::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_motorcycles_created_at")
                        .table(Motorcycles::Table)
                        .col(Motorcycles::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Motorcycles::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000003_create_motorcycle_images_table {
    use super::{MotorcycleImages, Motorcycles};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_motorcycle_images_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MotorcycleImages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MotorcycleImages::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MotorcycleImages::MotorcycleId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MotorcycleImages::ImageUrl).text().not_null())
                        .col(ColumnDef::new(MotorcycleImages::StorageKey).text().not_null())
                        .col(
                            ColumnDef::new(MotorcycleImages::DisplayOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(MotorcycleImages::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_motorcycle_images_motorcycle")
                                .from(MotorcycleImages::Table, MotorcycleImages::MotorcycleId)
                                .to(Motorcycles::Table, Motorcycles::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_motorcycle_images_motorcycle_id")
                        .table(MotorcycleImages::Table)
                        .col(MotorcycleImages::MotorcycleId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MotorcycleImages::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000004_create_clients_table {
    use super::Clients;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_clients_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Clients::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Clients::Name).string_len(255).not_null())
                        .col(ColumnDef::new(Clients::Document).string_len(32).null())
                        .col(ColumnDef::new(Clients::Phone).string_len(32).null())
                        .col(ColumnDef::new(Clients::Email).string_len(255).null())
                        .col(ColumnDef::new(Clients::Address).text().null())
                        .col(ColumnDef::new(Clients::Notes).text().null())
                        .col(
                            ColumnDef::new(Clients::ReliabilityScore)
                                .integer()
                                .not_null()
                                .default(5),
                        )
                        .col(
                            ColumnDef::new(Clients::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Clients::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000005_create_financial_records_table {
    use super::{money, Clients, FinancialRecords, Motorcycles, Users};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_financial_records_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FinancialRecords::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FinancialRecords::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FinancialRecords::Type).string_len(16).not_null())
                        .col(ColumnDef::new(FinancialRecords::Description).text().not_null())
                        .col(
                            money(manager, FinancialRecords::Amount)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FinancialRecords::Category)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(ColumnDef::new(FinancialRecords::Date).date().not_null())
                        .col(ColumnDef::new(FinancialRecords::MotorcycleId).integer().null())
                        .col(ColumnDef::new(FinancialRecords::ClientId).integer().null())
                        .col(ColumnDef::new(FinancialRecords::CreatedBy).integer().null())
                        .col(
                            ColumnDef::new(FinancialRecords::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FinancialRecords::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_financial_records_motorcycle")
                                .from(FinancialRecords::Table, FinancialRecords::MotorcycleId)
                                .to(Motorcycles::Table, Motorcycles::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_financial_records_client")
                                .from(FinancialRecords::Table, FinancialRecords::ClientId)
                                .to(Clients::Table, Clients::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_financial_records_created_by")
                                .from(FinancialRecords::Table, FinancialRecords::CreatedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_financial_records_date")
                        .table(FinancialRecords::Table)
                        .col(FinancialRecords::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_financial_records_client_id")
                        .table(FinancialRecords::Table)
                        .col(FinancialRecords::ClientId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FinancialRecords::Table).to_owned())
                .await
        }
    }
}
