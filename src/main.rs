mod clean;
mod eda;
mod eda_statistics;
mod error;
mod load_clean;
mod models;
#[cfg(test)]
mod test_fixtures;

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::eda_statistics::{correlation_matrix, ColumnReport};
use crate::error::AnalysisError;
use crate::load_clean::ingest_and_manipulate;
use crate::models::{
    CENTRAL_GOVERNMENT_DEBT, INTERESTED_COUNTRIES, INTEREST_PAYMENTS_EXPENSE, INTEREST_PAYMENTS_REVENUE,
    NUMERIC_COLUMNS,
};

#[derive(Parser, Debug)]
#[command(name = "fiscal-indicators")]
#[command(about = "Descriptive statistics and charts for government fiscal indicators by country")]
struct Args {
    /// World Bank CSV export to analyse
    #[arg(short, long, default_value = "sindhuData.csv")]
    input: PathBuf,

    /// Directory the charts and statistics report are written to
    #[arg(short, long, default_value = "charts")]
    output_dir: PathBuf,

    /// Year of the compensation of employees pie chart
    #[arg(long, default_value_t = 2017)]
    compensation_year: i32,

    /// Year of the interest payments (% of revenue) pie chart
    #[arg(long, default_value_t = 2020)]
    revenue_year: i32,

    /// First year of the goods and grants bar chart
    #[arg(long, default_value_t = 2015)]
    from_year: i32,

    /// Last year (inclusive) of the goods and grants bar chart
    #[arg(long, default_value_t = 2020)]
    to_year: i32,

    /// Countries shown in the compensation pie chart, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = INTERESTED_COUNTRIES.map(String::from))]
    countries: Vec<String>,

    /// Rows printed from each table preview
    #[arg(long, default_value_t = 5)]
    head: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.from_year > args.to_year {
        return Err(AnalysisError::InvalidYearRange {
            from: args.from_year,
            to: args.to_year,
        }
        .into());
    }

    info!("Loading {}", args.input.display());
    let (time_column_data, country_column_data, cleaned_data) = ingest_and_manipulate(&args.input)?;
    println!("Year as column data");
    println!("{}", time_column_data.head(args.head));
    println!("Country as column data");
    println!("{}", country_column_data.head(args.head));
    println!("Cleaned dataset");
    println!("{}", cleaned_data.head(args.head));

    let mut fiscal = country_column_data;
    fiscal.coerce_numeric_columns(&NUMERIC_COLUMNS)?;

    fs::create_dir_all(&args.output_dir).map_err(|source| AnalysisError::OutputDir {
        path: args.output_dir.clone(),
        source,
    })?;

    // Exploring the statistical properties
    let report = ColumnReport::from_table(&fiscal, CENTRAL_GOVERNMENT_DEBT)?;
    println!("{}", report);
    let report_file = args.output_dir.join("statistics.csv");
    report.write_csv(&report_file)?;
    info!("Statistics saved to {}", report_file.display());

    // Visualizations
    eda::central_government_debt(&fiscal, &args.output_dir.join("central_government_debt.png"))?;

    let interest_columns = [INTEREST_PAYMENTS_EXPENSE, INTEREST_PAYMENTS_REVENUE];
    let corr = correlation_matrix(&fiscal, &interest_columns)?;
    eda::interest_payments_heatmap(&corr, &interest_columns, &args.output_dir.join("interest_payments_heatmap.png"))?;

    let compensation_data = fiscal
        .filter_year(args.compensation_year)?
        .filter_countries(&args.countries)?;
    println!("{}", compensation_data);
    eda::compensation_of_employees(&compensation_data, &args.output_dir.join("compensation_of_employees.png"))?;

    let goods_and_grants_data = fiscal.filter_year_range(args.from_year..=args.to_year)?;
    eda::goods_and_grants(&goods_and_grants_data, &args.output_dir.join("goods_and_grants.png"))?;

    eda::interest_payments_expense(&fiscal, &args.output_dir.join("interest_payments_expense.png"))?;

    let pie_data = fiscal.filter_year(args.revenue_year)?;
    eda::interest_payments_revenue(
        &pie_data,
        args.revenue_year,
        &args.output_dir.join("interest_payments_revenue.png"),
    )?;

    info!("Wrote charts to {}", args.output_dir.display());
    Ok(())
}
