//! Synthetic data generator for the NexGen cost datasets
//!
//! Writes all seven CSV files with consistent keys. Costs are driven by route
//! distance, delivery delay and vehicle age so the dashboard and forecaster
//! have real structure to find. A fraction of measure cells is left blank to
//! exercise missing-value handling.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --orders <N>          Orders to generate (default: 200)
//!   --routes <N>          Routes (default: 25)
//!   --vehicles <N>        Vehicles (default: 40)
//!   --warehouses <N>      Warehouses (default: 5)
//!   --months <N>          Months of order history (default: 6)
//!   --blank-rate <F>      Probability a measure cell is blank (default: 0.02)
//!   --seed <N>            Random seed for reproducibility (optional)
//!   --output <DIR>        Output directory (default: data)

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use csv::WriterBuilder;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::{Path, PathBuf};

use nexgen_cost_intel::models::{
    CostBreakdown, Dataset, DeliveryRecord, FeedbackRecord, Order, Route, Vehicle, WarehouseRecord,
};

/// Synthetic data generator for the cost datasets
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate the seven NexGen logistics CSV datasets")]
struct Args {
    /// Orders to generate
    #[arg(long, default_value = "200")]
    orders: usize,

    /// Routes to generate
    #[arg(long, default_value = "25")]
    routes: usize,

    /// Vehicles to generate
    #[arg(long, default_value = "40")]
    vehicles: usize,

    /// Warehouses to generate
    #[arg(long, default_value = "5")]
    warehouses: usize,

    /// Months of order history, ending at --end-date
    #[arg(long, default_value = "6")]
    months: u32,

    /// Last possible order date
    #[arg(long, default_value = "2024-06-30")]
    end_date: NaiveDate,

    /// Probability that a measure cell is left blank (0.0 - 1.0)
    #[arg(long, default_value = "0.02")]
    blank_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory
    #[arg(long, default_value = "data")]
    output: PathBuf,
}

const CARRIERS: [&str; 5] = [
    "SpeedyLogistics",
    "QuickShip",
    "GlobalTransit",
    "ReliableExpress",
    "EcoDeliver",
];

const CATEGORIES: [&str; 6] = [
    "Electronics",
    "Fashion",
    "Food & Beverage",
    "Healthcare",
    "Home Goods",
    "Books",
];

const CITIES: [&str; 8] = [
    "Mumbai", "Delhi", "Bangalore", "Chennai", "Kolkata", "Hyderabad", "Pune", "Ahmedabad",
];

const VEHICLE_TYPES: [&str; 4] = ["Small Van", "Large Truck", "Refrigerated", "Express Bike"];

const ISSUES: [&str; 5] = [
    "None",
    "Delivery Delay",
    "Damaged Package",
    "Wrong Item",
    "Poor Service",
];

/// Leave a measure blank with probability `rate`
fn maybe_blank(value: f64, rate: f64, rng: &mut impl Rng) -> Option<f64> {
    if rng.gen::<f64>() < rate {
        None
    } else {
        Some((value * 100.0).round() / 100.0)
    }
}

fn generate_routes(args: &Args, rng: &mut impl Rng) -> Vec<Route> {
    (1..=args.routes)
        .map(|i| {
            let from = CITIES.choose(rng).copied().unwrap_or(CITIES[0]);
            let to = CITIES.choose(rng).copied().unwrap_or(CITIES[1]);
            let distance = rng.gen_range(50.0..2500.0);
            Route {
                route_id: format!("RT{:03}", i),
                name: format!("{}-{}", from, to),
                distance_km: maybe_blank(distance, args.blank_rate, rng),
                fuel_consumption_l: maybe_blank(
                    distance / rng.gen_range(6.0..12.0),
                    args.blank_rate,
                    rng,
                ),
                toll_charges: maybe_blank(distance * rng.gen_range(0.5..2.0), args.blank_rate, rng),
                traffic_delay_min: maybe_blank(rng.gen_range(0.0..120.0), args.blank_rate, rng),
            }
        })
        .collect()
}

fn generate_fleet(args: &Args, rng: &mut impl Rng) -> Vec<Vehicle> {
    (1..=args.vehicles)
        .map(|i| {
            let age: f64 = rng.gen_range(0..15) as f64;
            Vehicle {
                vehicle_id: format!("VH{:03}", i),
                vehicle_type: VEHICLE_TYPES
                    .choose(rng)
                    .copied()
                    .unwrap_or(VEHICLE_TYPES[0])
                    .to_string(),
                age_years: maybe_blank(age, args.blank_rate, rng),
                fuel_efficiency: maybe_blank(
                    14.0 - age * 0.4 + rng.gen_range(-1.0..1.0),
                    args.blank_rate,
                    rng,
                ),
                co2_per_km: maybe_blank(
                    0.15 + age * 0.02 + rng.gen_range(0.0..0.05),
                    args.blank_rate,
                    rng,
                ),
                maintenance_cost: maybe_blank(
                    800.0 + age * 250.0 + rng.gen_range(0.0..400.0),
                    args.blank_rate,
                    rng,
                ),
            }
        })
        .collect()
}

fn generate_warehouses(args: &Args, rng: &mut impl Rng) -> Vec<WarehouseRecord> {
    let mut records = Vec::new();
    for i in 1..=args.warehouses {
        let location = CITIES[(i - 1) % CITIES.len()];
        let stocked: Vec<&str> = CATEGORIES
            .iter()
            .copied()
            .filter(|_| rng.gen_bool(0.6))
            .collect();
        for category in stocked {
            records.push(WarehouseRecord {
                warehouse_id: format!("WH{:02}", i),
                location: location.to_string(),
                product_category: category.to_string(),
                inventory_cost: maybe_blank(
                    rng.gen_range(20_000.0..200_000.0),
                    args.blank_rate,
                    rng,
                ),
                storage_cost_per_unit: maybe_blank(rng.gen_range(2.0..15.0), args.blank_rate, rng),
            });
        }
    }
    records
}

/// Tables keyed by order id
struct OrderTables {
    orders: Vec<Order>,
    delivery: Vec<DeliveryRecord>,
    feedback: Vec<FeedbackRecord>,
    costs: Vec<CostBreakdown>,
}

fn generate_orders(
    args: &Args,
    routes: &[Route],
    fleet: &[Vehicle],
    warehouses: &[WarehouseRecord],
    rng: &mut impl Rng,
) -> OrderTables {
    let span_days = i64::from(args.months.max(1)) * 30;
    let start = args.end_date - Duration::days(span_days - 1);
    let mut tables = OrderTables {
        orders: Vec::with_capacity(args.orders),
        delivery: Vec::with_capacity(args.orders),
        feedback: Vec::with_capacity(args.orders),
        costs: Vec::with_capacity(args.orders),
    };

    for i in 1..=args.orders {
        let order_id = format!("ORD{:05}", i);
        let route = &routes[rng.gen_range(0..routes.len())];
        let vehicle = &fleet[rng.gen_range(0..fleet.len())];
        let warehouse = &warehouses[rng.gen_range(0..warehouses.len())];

        let distance = route.distance_km.unwrap_or(500.0);
        let age = vehicle.age_years.unwrap_or(5.0);
        let value = rng.gen_range(200.0..50_000.0);

        let promised = rng.gen_range(1..=7) as f64;
        let delay = match rng.gen_range(0..10) {
            0..=5 => 0.0,
            6..=7 => rng.gen_range(1..=2) as f64,
            _ => rng.gen_range(3..=6) as f64,
        };
        let early = if delay == 0.0 && rng.gen_bool(0.2) {
            1.0
        } else {
            0.0
        };
        let actual = (promised + delay - early).max(1.0);

        let fuel = distance * rng.gen_range(0.08..0.14) * (1.0 + age * 0.02);
        let labor = 40.0 + distance * 0.05 + delay * 25.0;
        let packaging = 10.0 + value * 0.002;
        let technology = 5.0 + value * 0.001;
        let other = 8.0 + delay * 10.0 + rng.gen_range(0.0..20.0);

        let rating = (5.0 - delay * 0.6 + rng.gen_range(-1.0..1.0)).round().clamp(1.0, 5.0);

        tables.orders.push(Order {
            order_id: order_id.clone(),
            order_date: start + Duration::days(rng.gen_range(0..span_days)),
            customer_id: format!("CUST{:04}", rng.gen_range(1..=args.orders.max(1) / 2 + 1)),
            product_category: warehouse.product_category.clone(),
            order_value: maybe_blank(value, args.blank_rate, rng),
            carrier: CARRIERS.choose(rng).copied().unwrap_or(CARRIERS[0]).to_string(),
            route_id: route.route_id.clone(),
            vehicle_id: vehicle.vehicle_id.clone(),
            warehouse_id: warehouse.warehouse_id.clone(),
        });
        tables.delivery.push(DeliveryRecord {
            order_id: order_id.clone(),
            promised_days: Some(promised),
            actual_days: maybe_blank(actual, args.blank_rate, rng),
            status: match delay {
                d if d <= 0.0 => "On-Time",
                d if d <= 2.0 => "Slightly-Delayed",
                _ => "Severely-Delayed",
            }
            .to_string(),
            customer_rating: maybe_blank(rating, args.blank_rate, rng),
        });
        tables.feedback.push(FeedbackRecord {
            order_id: order_id.clone(),
            rating: maybe_blank(rating, args.blank_rate, rng),
            feedback_text: String::new(),
            would_recommend: Some(if rating >= 4.0 { "Yes" } else { "No" }.to_string()),
            issue_category: if delay > 0.0 {
                ISSUES[1].to_string()
            } else {
                ISSUES.choose(rng).copied().unwrap_or(ISSUES[0]).to_string()
            },
        });
        tables.costs.push(CostBreakdown {
            order_id,
            fuel: maybe_blank(fuel, args.blank_rate, rng),
            labor: maybe_blank(labor, args.blank_rate, rng),
            packaging: maybe_blank(packaging, args.blank_rate, rng),
            technology: maybe_blank(technology, args.blank_rate, rng),
            other_overhead: maybe_blank(other, args.blank_rate, rng),
            vehicle_maintenance: Some((age * 3.0 * 100.0).round() / 100.0),
            insurance: Some(((value * 0.001) * 100.0).round() / 100.0),
        });
    }
    tables
}

fn write_table<T: Serialize>(dir: &Path, dataset: Dataset, rows: &[T]) -> Result<()> {
    let path = dir.join(dataset.file_name());
    let mut writer = WriterBuilder::new().has_headers(true).from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    println!("   {:<28} {:>6} rows", dataset.file_name(), rows.len());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    anyhow::ensure!(
        args.routes > 0 && args.vehicles > 0 && args.warehouses > 0,
        "--routes, --vehicles and --warehouses must be at least 1"
    );
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.blank_rate),
        "--blank-rate must be between 0 and 1"
    );

    println!("🔧 Synthetic Data Generator");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Output:           {}", args.output.display());
    println!("Orders:           {}", args.orders);
    println!("Routes:           {}", args.routes);
    println!("Vehicles:         {}", args.vehicles);
    println!("Warehouses:       {}", args.warehouses);
    println!("History:          {} months to {}", args.months, args.end_date);
    println!("Blank rate:       {:.1}%", args.blank_rate * 100.0);
    if let Some(seed) = args.seed {
        println!("Random seed:      {}", seed);
    }
    println!();

    // Initialize RNG
    let mut rng: StdRng = match args.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    std::fs::create_dir_all(&args.output)?;

    println!("🏭 Generating datasets...");
    let routes = generate_routes(&args, &mut rng);
    let fleet = generate_fleet(&args, &mut rng);
    let mut warehouses = generate_warehouses(&args, &mut rng);
    if warehouses.is_empty() {
        warehouses.push(WarehouseRecord {
            warehouse_id: "WH01".to_string(),
            location: CITIES[0].to_string(),
            product_category: CATEGORIES[0].to_string(),
            inventory_cost: Some(50_000.0),
            storage_cost_per_unit: Some(5.0),
        });
    }
    let orders = generate_orders(&args, &routes, &fleet, &warehouses, &mut rng);

    write_table(&args.output, Dataset::Orders, &orders.orders)?;
    write_table(&args.output, Dataset::Delivery, &orders.delivery)?;
    write_table(&args.output, Dataset::Routes, &routes)?;
    write_table(&args.output, Dataset::Fleet, &fleet)?;
    write_table(&args.output, Dataset::Warehouse, &warehouses)?;
    write_table(&args.output, Dataset::Feedback, &orders.feedback)?;
    write_table(&args.output, Dataset::Costs, &orders.costs)?;

    println!("\n✅ Generation complete!");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Output directory:  {}", args.output.display());

    Ok(())
}
