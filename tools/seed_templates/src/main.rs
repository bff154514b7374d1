use chrono::Utc;
use dotenvy::dotenv;
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

fn is_dry_run() -> bool {
    !std::env::args().any(|a| a == "--apply")
}

fn templates() -> Vec<(&'static str, &'static str, Value)> {
    vec![
        (
            "NYC",
            "Food Truck",
            json!([
                { "task": "Mobile Food Vendor License", "renewal": "Annual" },
                { "task": "Business License", "renewal": "Biennial" },
                { "task": "DCA License", "renewal": "Annual" },
                { "task": "Food Service Establishment Permit", "renewal": "Annual" },
                { "task": "Food Handler's License", "renewal": "3 years" },
                { "task": "Fire Department Permit", "renewal": "Annual" },
                { "task": "Commercial Vehicle Registration", "renewal": "Annual" },
                { "task": "Equipment Inspection", "renewal": "6 months" },
                { "task": "Propane Tank Certification", "renewal": "Annual" },
                { "task": "Workers' Compensation Insurance", "renewal": "Annual" },
                { "task": "General Liability Insurance", "renewal": "Annual" },
                { "task": "Parking Permit", "renewal": "Daily" },
                { "task": "Health Department Inspection", "renewal": "6 months" },
                { "task": "Commissary Kitchen Agreement", "renewal": "Annual" },
                { "task": "Sales Tax Registration", "renewal": "N/A" }
            ]),
        ),
        (
            "Dallas",
            "Food Truck",
            json!([
                { "task": "Mobile Food Unit Permit", "renewal": "Annual" },
                { "task": "Business License", "renewal": "Annual" },
                { "task": "Sales Tax Permit", "renewal": "N/A" },
                { "task": "Food Handler's License", "renewal": "2 years" },
                { "task": "Health Inspection", "renewal": "6 months" },
                { "task": "Fire Safety Inspection", "renewal": "Annual" },
                { "task": "Vending Location Permit", "renewal": "Daily/Event" },
                { "task": "Waste Disposal Agreement", "renewal": "Annual" },
                { "task": "Commissary Agreement", "renewal": "Monthly" },
                { "task": "Vehicle Registration", "renewal": "Annual" },
                { "task": "General Liability Insurance", "renewal": "Annual" },
                { "task": "Workers' Compensation Insurance", "renewal": "Annual" }
            ]),
        ),
        (
            "LA",
            "Food Truck",
            json!([
                { "task": "Business License (City)", "renewal": "Annual" },
                { "task": "Mobile Food Facility Permit", "renewal": "Annual" },
                { "task": "Reseller's Permit", "renewal": "N/A" },
                { "task": "County Health Permit", "renewal": "Annual" },
                { "task": "Food Manager Certification", "renewal": "5 years" },
                { "task": "Fire Department Inspection", "renewal": "Annual" },
                { "task": "Vending Route Permit", "renewal": "Annual" },
                { "task": "Commissary Kitchen Contract", "renewal": "Monthly" },
                { "task": "Workers' Compensation Insurance", "renewal": "Annual" },
                { "task": "General Liability Insurance", "renewal": "Annual" },
                { "task": "Vehicle Registration", "renewal": "Annual" },
                { "task": "Air Quality Management Permit", "renewal": "Annual" },
                { "task": "Parking Permit", "renewal": "Daily" },
                { "task": "Public Health License", "renewal": "Annual" },
                { "task": "Food Safety Certification", "renewal": "3 years" },
                { "task": "Equipment Compliance Check", "renewal": "6 months" },
                { "task": "Zoning Compliance Verification", "renewal": "Annual" },
                { "task": "Waste Management Contract", "renewal": "Annual" }
            ]),
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://compliance.db".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("../../migrations").run(&pool).await?;

    let dry_run = is_dry_run();
    let seed = templates();

    if dry_run {
        for (city, business_type, tasks) in &seed {
            println!(
                "[DRY RUN] Would seed template {} / {} ({} tasks)",
                city,
                business_type,
                tasks.as_array().map(|t| t.len()).unwrap_or(0)
            );
        }
        println!("Run with --apply to replace existing templates");
        return Ok(());
    }

    sqlx::query("DELETE FROM checklist_templates")
        .execute(&pool)
        .await?;
    println!("Cleared existing templates");

    let now = Utc::now().to_rfc3339();
    for (city, business_type, tasks) in &seed {
        sqlx::query(
            r#"
            INSERT INTO checklist_templates
                (id, city, business_type, tasks, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(city)
        .bind(business_type)
        .bind(tasks.to_string())
        .bind(&now)
        .execute(&pool)
        .await?;
        println!("Seeded template {} / {}", city, business_type);
    }

    println!("Templates seeded: {}", seed.len());

    Ok(())
}
