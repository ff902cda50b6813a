use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_reference_tables::Migration),
            Box::new(m20240101_000002_create_inventory_tables::Migration),
            Box::new(m20240101_000003_create_calls_and_store_inquiries::Migration),
            Box::new(m20240101_000004_create_lease_tables::Migration),
            Box::new(m20240101_000005_create_sales_tables::Migration),
            Box::new(m20240101_000006_create_deliveries_table::Migration),
        ]
    }
}

mod m20240101_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Stores::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Stores::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Stores::StoreName)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Stores::Location).string().not_null())
                        .col(
                            ColumnDef::new(Stores::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Clients::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Clients::ClientName).string().not_null())
                        .col(ColumnDef::new(Clients::ClientLocation).string().not_null())
                        .col(
                            ColumnDef::new(Clients::CreatedAt)
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
                        .name("idx_clients_name_location")
                        .table(Clients::Table)
                        .col(Clients::ClientName)
                        .col(Clients::ClientLocation)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ClientMachines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ClientMachines::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ClientMachines::ClientName).string().not_null())
                        .col(
                            ColumnDef::new(ClientMachines::ClientLocation)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ClientMachines::MachineName).string().not_null())
                        .col(ColumnDef::new(ClientMachines::MachineBrand).string().not_null())
                        .col(
                            ColumnDef::new(ClientMachines::SerialNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(ClientMachines::MachineType).string().not_null())
                        .col(ColumnDef::new(ClientMachines::Description).text().null())
                        .col(
                            ColumnDef::new(ClientMachines::CreatedAt)
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
                        .name("idx_client_machines_owner")
                        .table(ClientMachines::Table)
                        .col(ClientMachines::ClientName)
                        .col(ClientMachines::ClientLocation)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ItemTypes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(ItemTypes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(ItemTypes::Category).string().not_null())
                        .col(ColumnDef::new(ItemTypes::Name).string().not_null())
                        .col(ColumnDef::new(ItemTypes::TypeName).string().not_null())
                        .col(ColumnDef::new(ItemTypes::Brand).string().not_null())
                        .col(ColumnDef::new(ItemTypes::Color).string().not_null())
                        .col(
                            ColumnDef::new(ItemTypes::CreatedAt)
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
                        .name("idx_item_types_category_name")
                        .table(ItemTypes::Table)
                        .col(ItemTypes::Category)
                        .col(ItemTypes::Name)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ItemTypes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ClientMachines::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Stores::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Stores {
        Table,
        Id,
        StoreName,
        Location,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Clients {
        Table,
        Id,
        ClientName,
        ClientLocation,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ClientMachines {
        Table,
        Id,
        ClientName,
        ClientLocation,
        MachineName,
        MachineBrand,
        SerialNo,
        MachineType,
        Description,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum ItemTypes {
        Table,
        Id,
        Category,
        Name,
        TypeName,
        Brand,
        Color,
        CreatedAt,
    }
}

mod m20240101_000002_create_inventory_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_inventory_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Machines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Machines::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Machines::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Machines::MachineName).string().not_null())
                        .col(ColumnDef::new(Machines::MachineType).string().not_null())
                        .col(
                            ColumnDef::new(Machines::SerialNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Machines::MachineCondition)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Machines::UnitValue)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Machines::Quantity)
                                .integer()
                                .not_null()
                                .default(1)
                                .check(Expr::col(Machines::Quantity).gte(0)),
                        )
                        .col(ColumnDef::new(Machines::Status).string().not_null())
                        .col(
                            ColumnDef::new(Machines::IsTransfer)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Machines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Machines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_machines_store_id")
                                .from(Machines::Table, Machines::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Parts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Parts::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Parts::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Parts::PartName).string().not_null())
                        .col(ColumnDef::new(Parts::PartType).string().not_null())
                        .col(
                            ColumnDef::new(Parts::RefNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Parts::UnitValue)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Parts::InitialQuantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(Parts::InitialQuantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Parts::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(Parts::Quantity).gte(0)),
                        )
                        .col(ColumnDef::new(Parts::Status).string().not_null())
                        .col(
                            ColumnDef::new(Parts::IsTransfer)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Parts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Parts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_parts_store_id")
                                .from(Parts::Table, Parts::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Accessories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Accessories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Accessories::StoreId).uuid().not_null())
                        .col(ColumnDef::new(Accessories::AccName).string().not_null())
                        .col(ColumnDef::new(Accessories::AccType).string().not_null())
                        .col(
                            ColumnDef::new(Accessories::RefNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Accessories::UnitValue)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Accessories::InitialQuantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(Accessories::InitialQuantity).gte(0)),
                        )
                        .col(
                            ColumnDef::new(Accessories::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(Accessories::Quantity).gte(0)),
                        )
                        .col(ColumnDef::new(Accessories::Status).string().not_null())
                        .col(
                            ColumnDef::new(Accessories::IsTransfer)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Accessories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Accessories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_accessories_store_id")
                                .from(Accessories::Table, Accessories::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_machines_store_id")
                        .table(Machines::Table)
                        .col(Machines::StoreId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_parts_store_id")
                        .table(Parts::Table)
                        .col(Parts::StoreId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_accessories_store_id")
                        .table(Accessories::Table)
                        .col(Accessories::StoreId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Accessories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Parts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Machines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Machines {
        Table,
        Id,
        StoreId,
        MachineName,
        MachineType,
        SerialNo,
        MachineCondition,
        UnitValue,
        Quantity,
        Status,
        IsTransfer,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Parts {
        Table,
        Id,
        StoreId,
        PartName,
        PartType,
        RefNo,
        UnitValue,
        InitialQuantity,
        Quantity,
        Status,
        IsTransfer,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Accessories {
        Table,
        Id,
        StoreId,
        AccName,
        AccType,
        RefNo,
        UnitValue,
        InitialQuantity,
        Quantity,
        Status,
        IsTransfer,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Stores {
        Table,
        Id,
    }
}

mod m20240101_000003_create_calls_and_store_inquiries {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_calls_and_store_inquiries"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Calls::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Calls::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Calls::TicketNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Calls::ContractType).string().not_null())
                        .col(ColumnDef::new(Calls::ClientId).uuid().null())
                        .col(ColumnDef::new(Calls::ItemId).uuid().null())
                        .col(ColumnDef::new(Calls::ClientName).string().null())
                        .col(ColumnDef::new(Calls::ClientLocation).string().null())
                        .col(ColumnDef::new(Calls::ClientMachineId).uuid().null())
                        .col(ColumnDef::new(Calls::WalkInMachineName).string().null())
                        .col(ColumnDef::new(Calls::WalkInMachineType).string().null())
                        .col(ColumnDef::new(Calls::WalkInSerialNo).string().null())
                        .col(ColumnDef::new(Calls::ReportedBy).string().not_null())
                        .col(ColumnDef::new(Calls::ReportedDate).date().not_null())
                        .col(ColumnDef::new(Calls::FaultReported).text().not_null())
                        .col(ColumnDef::new(Calls::ActionTaken).json().not_null())
                        .col(ColumnDef::new(Calls::PartsRequired).json().not_null())
                        .col(ColumnDef::new(Calls::PartsUsed).json().not_null())
                        .col(
                            ColumnDef::new(Calls::MeterReading)
                                .big_integer()
                                .not_null()
                                .default(0)
                                .check(Expr::col(Calls::MeterReading).gte(0)),
                        )
                        .col(ColumnDef::new(Calls::SpareDescription).text().null())
                        .col(ColumnDef::new(Calls::Comments).text().null())
                        .col(ColumnDef::new(Calls::Department).string().null())
                        .col(ColumnDef::new(Calls::Status).string().not_null())
                        .col(
                            ColumnDef::new(Calls::IsChecked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Calls::DirectorComment).text().null())
                        .col(
                            ColumnDef::new(Calls::TechnicianManagerApproval)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Calls::ClientVerification)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Calls::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Calls::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_calls_client_id")
                                .from(Calls::Table, Calls::ClientId)
                                .to(Clients::Table, Clients::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_calls_item_id")
                                .from(Calls::Table, Calls::ItemId)
                                .to(Machines::Table, Machines::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_calls_client_machine_id")
                                .from(Calls::Table, Calls::ClientMachineId)
                                .to(ClientMachines::Table, ClientMachines::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CallTechnicians::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(CallTechnicians::CallId).uuid().not_null())
                        .col(
                            ColumnDef::new(CallTechnicians::TechnicianId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CallTechnicians::AssignedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(CallTechnicians::CallId)
                                .col(CallTechnicians::TechnicianId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_call_technicians_call_id")
                                .from(CallTechnicians::Table, CallTechnicians::CallId)
                                .to(Calls::Table, Calls::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_call_technicians_technician_id")
                        .table(CallTechnicians::Table)
                        .col(CallTechnicians::TechnicianId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StoreInquiries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StoreInquiries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StoreInquiries::ServiceCallId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StoreInquiries::PartName).string().not_null())
                        .col(ColumnDef::new(StoreInquiries::PartId).uuid().null())
                        .col(
                            ColumnDef::new(StoreInquiries::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(StoreInquiries::Quantity).gt(0)),
                        )
                        .col(ColumnDef::new(StoreInquiries::RequestedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(StoreInquiries::RequestedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StoreInquiries::UnitPrice)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StoreInquiries::AddVat)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(StoreInquiries::IsIssued)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(StoreInquiries::IssuedBy).uuid().null())
                        .col(ColumnDef::new(StoreInquiries::Status).string().not_null())
                        .col(ColumnDef::new(StoreInquiries::Notes).text().null())
                        .col(
                            ColumnDef::new(StoreInquiries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_store_inquiries_service_call_id")
                                .from(StoreInquiries::Table, StoreInquiries::ServiceCallId)
                                .to(Calls::Table, Calls::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_store_inquiries_part_id")
                                .from(StoreInquiries::Table, StoreInquiries::PartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_store_inquiries_service_call_id")
                        .table(StoreInquiries::Table)
                        .col(StoreInquiries::ServiceCallId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StoreInquiries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CallTechnicians::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Calls::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Calls {
        Table,
        Id,
        TicketNo,
        ContractType,
        ClientId,
        ItemId,
        ClientName,
        ClientLocation,
        ClientMachineId,
        WalkInMachineName,
        WalkInMachineType,
        WalkInSerialNo,
        ReportedBy,
        ReportedDate,
        FaultReported,
        ActionTaken,
        PartsRequired,
        PartsUsed,
        MeterReading,
        SpareDescription,
        Comments,
        Department,
        Status,
        IsChecked,
        DirectorComment,
        TechnicianManagerApproval,
        ClientVerification,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum StoreInquiries {
        Table,
        Id,
        ServiceCallId,
        PartName,
        PartId,
        Quantity,
        RequestedBy,
        RequestedAt,
        UnitPrice,
        AddVat,
        IsIssued,
        IssuedBy,
        Status,
        Notes,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CallTechnicians {
        Table,
        CallId,
        TechnicianId,
        AssignedAt,
    }

    #[derive(DeriveIden)]
    enum Clients {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum ClientMachines {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Machines {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Parts {
        Table,
        Id,
    }
}

mod m20240101_000004_create_lease_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_lease_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(LeaseContracts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LeaseContracts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LeaseContracts::LeaseNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(LeaseContracts::ClientId).uuid().not_null())
                        .col(ColumnDef::new(LeaseContracts::Department).string().null())
                        .col(ColumnDef::new(LeaseContracts::ItemId).uuid().not_null())
                        .col(ColumnDef::new(LeaseContracts::StoreId).uuid().not_null())
                        .col(ColumnDef::new(LeaseContracts::FromDate).date().not_null())
                        .col(ColumnDef::new(LeaseContracts::ToDate).date().not_null())
                        .col(
                            ColumnDef::new(LeaseContracts::AddVat)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(LeaseContracts::AddMyq)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(LeaseContracts::BilledMyq)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(LeaseContracts::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(LeaseContracts::ContractType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LeaseContracts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LeaseContracts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_lease_contracts_client_id")
                                .from(LeaseContracts::Table, LeaseContracts::ClientId)
                                .to(Clients::Table, Clients::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_lease_contracts_item_id")
                                .from(LeaseContracts::Table, LeaseContracts::ItemId)
                                .to(Machines::Table, Machines::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_lease_contracts_store_id")
                                .from(LeaseContracts::Table, LeaseContracts::StoreId)
                                .to(Stores::Table, Stores::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LeasePartInquiries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LeasePartInquiries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LeasePartInquiries::LeaseId).uuid().not_null())
                        .col(
                            ColumnDef::new(LeasePartInquiries::StoreInquiryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LeasePartInquiries::PartId).uuid().not_null())
                        .col(
                            ColumnDef::new(LeasePartInquiries::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(LeasePartInquiries::Quantity).gt(0)),
                        )
                        .col(
                            ColumnDef::new(LeasePartInquiries::Amount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LeasePartInquiries::Vat)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(LeasePartInquiries::Date).date().not_null())
                        .col(
                            ColumnDef::new(LeasePartInquiries::IsPaid)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(LeasePartInquiries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LeasePartInquiries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_lease_part_inquiries_lease_id")
                                .from(LeasePartInquiries::Table, LeasePartInquiries::LeaseId)
                                .to(LeaseContracts::Table, LeaseContracts::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_lease_part_inquiries_store_inquiry_id")
                                .from(
                                    LeasePartInquiries::Table,
                                    LeasePartInquiries::StoreInquiryId,
                                )
                                .to(StoreInquiries::Table, StoreInquiries::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_lease_part_inquiries_part_id")
                                .from(LeasePartInquiries::Table, LeasePartInquiries::PartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(LeaseAccInquiries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(LeaseAccInquiries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(LeaseAccInquiries::LeaseId).uuid().not_null())
                        .col(
                            ColumnDef::new(LeaseAccInquiries::AccessoryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LeaseAccInquiries::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(LeaseAccInquiries::Quantity).gt(0)),
                        )
                        .col(
                            ColumnDef::new(LeaseAccInquiries::Amount)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(LeaseAccInquiries::Vat)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(LeaseAccInquiries::Date).date().not_null())
                        .col(
                            ColumnDef::new(LeaseAccInquiries::IsPaid)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(LeaseAccInquiries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(LeaseAccInquiries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_lease_acc_inquiries_lease_id")
                                .from(LeaseAccInquiries::Table, LeaseAccInquiries::LeaseId)
                                .to(LeaseContracts::Table, LeaseContracts::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_lease_acc_inquiries_accessory_id")
                                .from(LeaseAccInquiries::Table, LeaseAccInquiries::AccessoryId)
                                .to(Accessories::Table, Accessories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MeterReadings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MeterReadings::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MeterReadings::LeaseId).uuid().not_null())
                        .col(ColumnDef::new(MeterReadings::MachineId).uuid().not_null())
                        .col(ColumnDef::new(MeterReadings::Month).date().not_null())
                        .col(
                            ColumnDef::new(MeterReadings::MeterReading)
                                .big_integer()
                                .not_null()
                                .check(Expr::col(MeterReadings::MeterReading).gte(0)),
                        )
                        .col(
                            ColumnDef::new(MeterReadings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MeterReadings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_meter_readings_lease_id")
                                .from(MeterReadings::Table, MeterReadings::LeaseId)
                                .to(LeaseContracts::Table, LeaseContracts::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_meter_readings_machine_id")
                                .from(MeterReadings::Table, MeterReadings::MachineId)
                                .to(Machines::Table, Machines::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_meter_readings_lease_month")
                        .table(MeterReadings::Table)
                        .col(MeterReadings::LeaseId)
                        .col(MeterReadings::Month)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_lease_part_inquiries_part_id")
                        .table(LeasePartInquiries::Table)
                        .col(LeasePartInquiries::PartId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_lease_acc_inquiries_accessory_id")
                        .table(LeaseAccInquiries::Table)
                        .col(LeaseAccInquiries::AccessoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MeterReadings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LeaseAccInquiries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LeasePartInquiries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(LeaseContracts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum LeaseContracts {
        Table,
        Id,
        LeaseNo,
        ClientId,
        Department,
        ItemId,
        StoreId,
        FromDate,
        ToDate,
        AddVat,
        AddMyq,
        BilledMyq,
        IsActive,
        ContractType,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum LeasePartInquiries {
        Table,
        Id,
        LeaseId,
        StoreInquiryId,
        PartId,
        Quantity,
        Amount,
        Vat,
        Date,
        IsPaid,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum LeaseAccInquiries {
        Table,
        Id,
        LeaseId,
        AccessoryId,
        Quantity,
        Amount,
        Vat,
        Date,
        IsPaid,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum MeterReadings {
        Table,
        Id,
        LeaseId,
        MachineId,
        Month,
        MeterReading,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Clients {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Machines {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Stores {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Parts {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Accessories {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum StoreInquiries {
        Table,
        Id,
    }
}

mod m20240101_000005_create_sales_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_sales_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Sales::SaleNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Sales::SaleType).string().not_null())
                        .col(ColumnDef::new(Sales::ClientId).uuid().null())
                        .col(ColumnDef::new(Sales::LocalClientName).string().null())
                        .col(ColumnDef::new(Sales::SaleDate).date().not_null())
                        .col(ColumnDef::new(Sales::Notes).text().null())
                        .col(
                            ColumnDef::new(Sales::AddVat)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Sales::StoreInquiryId).uuid().null())
                        .col(
                            ColumnDef::new(Sales::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sales::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_client_id")
                                .from(Sales::Table, Sales::ClientId)
                                .to(Clients::Table, Clients::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_store_inquiry_id")
                                .from(Sales::Table, Sales::StoreInquiryId)
                                .to(StoreInquiries::Table, StoreInquiries::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SaleItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(SaleItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(SaleItems::SaleId).uuid().not_null())
                        .col(ColumnDef::new(SaleItems::SaleType).string().not_null())
                        .col(ColumnDef::new(SaleItems::MachineId).uuid().null())
                        .col(ColumnDef::new(SaleItems::PartId).uuid().null())
                        .col(ColumnDef::new(SaleItems::AccessoryId).uuid().null())
                        .col(
                            ColumnDef::new(SaleItems::Quantity)
                                .integer()
                                .not_null()
                                .check(Expr::col(SaleItems::Quantity).gt(0)),
                        )
                        .col(
                            ColumnDef::new(SaleItems::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SaleItems::TotalPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SaleItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SaleItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_items_sale_id")
                                .from(SaleItems::Table, SaleItems::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_items_machine_id")
                                .from(SaleItems::Table, SaleItems::MachineId)
                                .to(Machines::Table, Machines::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_items_part_id")
                                .from(SaleItems::Table, SaleItems::PartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_items_accessory_id")
                                .from(SaleItems::Table, SaleItems::AccessoryId)
                                .to(Accessories::Table, Accessories::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_items_sale_id")
                        .table(SaleItems::Table)
                        .col(SaleItems::SaleId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_items_part_id")
                        .table(SaleItems::Table)
                        .col(SaleItems::PartId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_items_accessory_id")
                        .table(SaleItems::Table)
                        .col(SaleItems::AccessoryId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SaleItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
        SaleNo,
        SaleType,
        ClientId,
        LocalClientName,
        SaleDate,
        Notes,
        AddVat,
        StoreInquiryId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum SaleItems {
        Table,
        Id,
        SaleId,
        SaleType,
        MachineId,
        PartId,
        AccessoryId,
        Quantity,
        UnitPrice,
        TotalPrice,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Clients {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum StoreInquiries {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Machines {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Parts {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum Accessories {
        Table,
        Id,
    }
}

mod m20240101_000006_create_deliveries_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_deliveries_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Deliveries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Deliveries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Deliveries::DeliveryNo)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Deliveries::DeliveryType).string().not_null())
                        .col(ColumnDef::new(Deliveries::SaleId).uuid().null())
                        .col(ColumnDef::new(Deliveries::LeaseId).uuid().null())
                        .col(ColumnDef::new(Deliveries::AssignedTo).uuid().not_null())
                        .col(ColumnDef::new(Deliveries::DeliveryDate).date().not_null())
                        .col(ColumnDef::new(Deliveries::Status).string().not_null())
                        .col(ColumnDef::new(Deliveries::Notes).text().null())
                        .col(
                            ColumnDef::new(Deliveries::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Deliveries::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deliveries_sale_id")
                                .from(Deliveries::Table, Deliveries::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deliveries_lease_id")
                                .from(Deliveries::Table, Deliveries::LeaseId)
                                .to(LeaseContracts::Table, LeaseContracts::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_deliveries_assigned_to")
                        .table(Deliveries::Table)
                        .col(Deliveries::AssignedTo)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Deliveries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Deliveries {
        Table,
        Id,
        DeliveryNo,
        DeliveryType,
        SaleId,
        LeaseId,
        AssignedTo,
        DeliveryDate,
        Status,
        Notes,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Sales {
        Table,
        Id,
    }

    #[derive(DeriveIden)]
    enum LeaseContracts {
        Table,
        Id,
    }
}

// Database migration CLI runner
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(4)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
