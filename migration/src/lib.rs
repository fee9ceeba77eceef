pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_cafes;
mod m20250301_000002_create_matches;
mod m20250301_000003_create_seating;
mod m20250301_000004_create_bookings;
mod m20250301_000005_create_loyalty;
mod m20250301_000006_create_subscriptions;
mod m20250301_000007_create_staff_and_offers;
mod m20250301_000008_create_qr_scan_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_cafes::Migration),
            Box::new(m20250301_000002_create_matches::Migration),
            Box::new(m20250301_000003_create_seating::Migration),
            Box::new(m20250301_000004_create_bookings::Migration),
            Box::new(m20250301_000005_create_loyalty::Migration),
            Box::new(m20250301_000006_create_subscriptions::Migration),
            Box::new(m20250301_000007_create_staff_and_offers::Migration),
            Box::new(m20250301_000008_create_qr_scan_logs::Migration),
        ]
    }
}
