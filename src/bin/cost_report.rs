//! Cost Intelligence Report - where does the money go?
//! Overview KPIs, cost leakage, optimization opportunities and recommendations
//!
//! Run: ./target/release/cost_report [section] [--data-dir DIR] [--carrier NAME] ...
//! Sections: all, overview, leakage, optimization, recommendations

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use nexgen_cost_intel::aggregate::{CostAggregates, GroupTable};
use nexgen_cost_intel::config::Config;
use nexgen_cost_intel::dashboard::{Dashboard, DashboardView, Filters, Section};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportSection {
    All,
    Overview,
    Leakage,
    Optimization,
    Recommendations,
}

#[derive(Parser, Debug)]
#[command(name = "cost_report")]
#[command(about = "Print the cost dashboard as a terminal report")]
struct Args {
    /// Report section
    #[arg(value_enum, default_value_t = ReportSection::All)]
    section: ReportSection,

    #[arg(long)]
    carrier: Option<String>,

    #[arg(long)]
    product_category: Option<String>,

    #[arg(long)]
    warehouse_id: Option<String>,

    /// First order date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last order date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    #[command(flatten)]
    config: Config,
}

fn print_section_header(title: &str) {
    println!("\n{}", "═".repeat(80));
    println!("  {}", title);
    println!("{}\n", "═".repeat(80));
}

fn print_subsection(title: &str) {
    println!("\n{}", title);
    println!("{}", "─".repeat(70));
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    }
}

fn fmt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}

fn print_groups(label: &str, table: &GroupTable, decimals: usize) {
    if table.is_empty() {
        println!("  {:22} no data", label);
        return;
    }
    println!("  {:22} {:>8} {:>14}", label, "Rows", "Value");
    for g in table {
        println!("  {:22} {:>8} {:>14.*}", g.key, g.rows, decimals, g.value);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let filters = Filters {
        carrier: args.carrier,
        product_category: args.product_category,
        warehouse_id: args.warehouse_id,
        from: args.from,
        to: args.to,
    };

    let dashboard = Dashboard::load(args.config)?;
    let view = dashboard.view(&filters);

    println!("\n{}", "█".repeat(80));
    println!(
        "{}  NEXGEN COST INTELLIGENCE - Where Does The Money Go?  {}",
        "█".repeat(12),
        "█".repeat(12)
    );
    println!("{}\n", "█".repeat(80));

    match args.section {
        ReportSection::All => {
            run_overview_section(&view);
            run_leakage_section(&view);
            run_optimization_section(&view);
            run_recommendations_section(&view);
        }
        ReportSection::Overview => run_overview_section(&view),
        ReportSection::Leakage => run_leakage_section(&view),
        ReportSection::Optimization => run_optimization_section(&view),
        ReportSection::Recommendations => run_recommendations_section(&view),
    }

    println!("\n{}", "█".repeat(80));
    Ok(())
}

/// Aggregates or the reason they are missing
fn aggregates(view: &DashboardView) -> Option<&CostAggregates> {
    match &view.aggregates {
        Section::Ready(a) => Some(a),
        Section::Unavailable { reason } => {
            println!("  Unavailable: {}", reason);
            None
        }
    }
}

fn run_overview_section(view: &DashboardView) {
    print_section_header("1. OVERVIEW");

    print_subsection("Data Quality");
    for (dataset, rows) in &view.data_quality.row_counts {
        println!("  {:28} {:>8} rows", dataset.file_name(), rows);
    }
    for err in &view.data_quality.load_errors {
        println!("  ✗ {}", err);
    }
    if let Some(join) = &view.data_quality.join {
        println!("  Joined orders:        {:>8} of {}", join.joined, join.input_orders);
        for (dataset, count) in &join.unmatched {
            println!("  Unmatched in {:<20} {:>6}", dataset.to_string(), count);
        }
        for (dataset, count) in &join.duplicate_keys {
            println!("  Duplicate keys in {:<15} {:>6}", dataset.to_string(), count);
        }
    }
    println!("  After filters:        {:>8}", view.data_quality.filtered_rows);

    let Some(a) = aggregates(view) else {
        return;
    };

    print_subsection("Key Metrics");
    let s = &a.summary;
    println!("  Orders:               {:>12}", s.orders);
    println!("  Total Order Value:    {:>12}", fmt_opt(s.total_order_value, 2));
    println!("  Avg Order Value:      {:>12}", fmt_opt(s.avg_order_value, 2));
    println!("  Total Cost:           {:>12}", fmt_opt(s.total_cost, 2));
    println!("  Avg Cost/Value:       {:>12}", fmt_pct(s.avg_cost_to_value));
    println!("  Avg Customer Rating:  {:>12}", fmt_opt(s.avg_customer_rating, 2));

    print_subsection("Cost Breakdown by Type");
    match &a.cost_breakdown {
        Some(b) => {
            println!("  {:14} {:>14} {:>12} {:>8}", "Category", "Total", "Per Order", "Share");
            for c in &b.categories {
                println!(
                    "  {:14} {:>14.2} {:>12.2} {:>8}",
                    c.label,
                    c.total,
                    c.average,
                    c.percent.map_or("n/a".to_string(), |p| format!("{:.1}%", p))
                );
            }
            println!("  ({} orders with a complete breakdown)", b.orders);
        }
        None => println!("  no orders with a complete cost breakdown"),
    }
}

fn run_leakage_section(view: &DashboardView) {
    print_section_header("2. COST LEAKAGE");
    let Some(a) = aggregates(view) else {
        return;
    };
    let l = &a.leakage;

    print_subsection(&format!("High-Cost Orders (cost > {:.0}% of value)", l.threshold * 100.0));
    println!(
        "  {} of {} orders ({})",
        l.high_cost_orders.len(),
        l.orders_with_ratio,
        fmt_pct(l.high_cost_share)
    );
    println!("  {:12} {:18} {:>12} {:>12} {:>8}", "Order", "Carrier", "Value", "Cost", "Ratio");
    for o in l.high_cost_orders.iter().take(15) {
        println!(
            "  {:12} {:18} {:>12} {:>12} {:>7.1}%",
            o.order_id,
            o.carrier,
            fmt_opt(o.order_value, 2),
            fmt_opt(o.total_cost, 2),
            o.cost_to_value * 100.0
        );
    }

    print_subsection("Cost-to-Value Ratio Distribution");
    let max = l.ratio_histogram.iter().map(|b| b.count).max().unwrap_or(0);
    for bin in &l.ratio_histogram {
        let width = if max > 0 { bin.count * 40 / max } else { 0 };
        println!(
            "  {:>6.3}-{:<6.3} {:>5} {}",
            bin.lower,
            bin.upper,
            bin.count,
            "▇".repeat(width)
        );
    }

    print_subsection("Average Cost/Value by Carrier");
    print_groups("Carrier", &l.avg_cost_to_value_by_carrier, 3);

    print_subsection("Cost by Delivery Delay");
    print_groups("Delay bucket", &a.delay.avg_cost, 2);
    print_groups("Delay bucket (ratio)", &a.delay.avg_cost_to_value, 3);
    print_groups("Delay bucket (rating)", &a.delay.avg_customer_rating, 2);

    print_subsection("Cost by Customer Satisfaction");
    print_groups("Satisfaction", &a.feedback.avg_cost, 2);
    print_groups("Satisfaction (delay)", &a.feedback.avg_delay_days, 2);
}

fn run_optimization_section(view: &DashboardView) {
    print_section_header("3. OPTIMIZATION OPPORTUNITIES");

    if let Some(a) = aggregates(view) {
        let r = &a.routes;
        print_subsection("Route Cost Relationship");
        println!("  Distance → cost correlation: {:>8}", fmt_opt(r.distance_cost_correlation, 3));
        println!("  Tolls → cost correlation:    {:>8}", fmt_opt(r.toll_cost_correlation, 3));
        println!("  Cost per extra km:           {:>8}", fmt_opt(r.cost_per_km_slope, 3));
        println!();
        println!(
            "  {:8} {:24} {:>6} {:>10} {:>12} {:>10}",
            "Route", "Name", "Orders", "Km", "Avg Cost", "Cost/Km"
        );
        let mut points: Vec<_> = r.points.iter().collect();
        points.sort_by(|a, b| {
            b.cost_per_km
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&a.cost_per_km.unwrap_or(f64::NEG_INFINITY))
        });
        for p in points.iter().take(10) {
            println!(
                "  {:8} {:24} {:>6} {:>10} {:>12} {:>10}",
                p.route_id,
                p.name,
                p.orders,
                fmt_opt(p.distance_km, 0),
                fmt_opt(p.avg_total_cost, 2),
                fmt_opt(p.cost_per_km, 3)
            );
        }
    }

    print_subsection("Fleet by Vehicle Age");
    match &view.fleet {
        Section::Ready(f) => {
            print_groups("Vehicles", &f.vehicles, 0);
            print_groups("Fuel efficiency", &f.avg_fuel_efficiency, 2);
            print_groups("Maintenance cost", &f.avg_maintenance_cost, 2);
            print_groups("CO2 per km", &f.avg_emissions, 3);
        }
        Section::Unavailable { reason } => println!("  Unavailable: {}", reason),
    }

    print_subsection("Warehouse Storage Costs");
    match &view.warehouses {
        Section::Ready(w) => {
            print_groups("Warehouse", &w.avg_storage_cost, 2);
            println!(
                "  Mean storage cost {}; above mean: {}",
                fmt_opt(w.mean_storage_cost, 2),
                if w.high_cost_warehouses.is_empty() {
                    "none".to_string()
                } else {
                    w.high_cost_warehouses.join(", ")
                }
            );
        }
        Section::Unavailable { reason } => println!("  Unavailable: {}", reason),
    }
}

fn run_recommendations_section(view: &DashboardView) {
    print_section_header("4. RECOMMENDATIONS");

    print_subsection("Cost Forecast");
    match &view.forecast {
        Section::Ready(f) => {
            println!("  Model:                {:?}", f.model);
            println!("  Train / test rows:    {} / {}", f.train_rows, f.test_rows);
            if let Some(m) = &f.metrics {
                println!("  MAE:                  {:>10.2}", m.mae);
                println!("  RMSE:                 {:>10.2}", m.rmse);
                println!("  R²:                   {:>10}", fmt_opt(m.r2, 3));
            }
            println!("  Anomalous orders:     {:>10}", fmt_pct(f.anomaly_share));
            if !f.feature_importances.is_empty() {
                println!();
                for fi in &f.feature_importances {
                    println!("  {:20} {:>6.1}%", fi.feature, fi.importance * 100.0);
                }
            }
            println!();
            for m in &f.history {
                println!(
                    "  {}  actual    {:>10.2}  ({} orders)",
                    m.month.format("%Y-%m"),
                    m.avg_cost,
                    m.orders
                );
            }
            for p in &f.extrapolation {
                println!("  {}  forecast  {:>10.2}", p.month.format("%Y-%m"), p.predicted_cost);
            }
        }
        Section::Unavailable { reason } => println!("  Unavailable: {}", reason),
    }

    print_subsection("Recommended Strategies");
    println!("  {:3} {:32} {:>8} {:>10}  {}", "#", "Strategy", "Base", "Estimate", "Signal");
    for r in &view.recommendations {
        println!(
            "  {:<3} {:32} {:>7.1}% {:>9.1}%  {} = {}",
            r.rank,
            r.name,
            r.base_savings_pct,
            r.estimated_savings_pct,
            r.signal,
            fmt_opt(r.signal_value, 3)
        );
    }
    for r in &view.recommendations {
        println!("\n  {}. {}: {}", r.rank, r.name, r.rationale);
        for action in &r.actions {
            println!("     - {}", action);
        }
    }
}
