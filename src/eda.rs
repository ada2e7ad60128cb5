use std::error::Error;
use std::ops::Range;
use std::path::Path;

use itertools::Itertools;
use ndarray::Array2;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::load_clean::Table;
use crate::models::{
    CENTRAL_GOVERNMENT_DEBT, COMPENSATION_OF_EMPLOYEES, COUNTRY_NAME, GOODS_AND_SERVICES_EXPENSE,
    GRANTS_AND_OTHER_REVENUE, INTEREST_PAYMENTS_EXPENSE, INTEREST_PAYMENTS_REVENUE, TIME,
};

const BAR_WIDTH: f64 = 0.35;
const PINK: RGBColor = RGBColor(255, 192, 203);
// Screen y grows downwards, so negate to start 140 degrees anticlockwise
// from three o'clock (upper left). Slices then run clockwise.
const PIE_START_ANGLE: f64 = -140.0;

// Years outside this window are treated as unplottable rather than cast.
const MAX_ABS_YEAR: f64 = 9999.0;

/// Per-country runs of (year, value) points; countries sorted by name, runs by year.
type CountrySeries = Vec<(String, Vec<Vec<(i32, f64)>>)>;

/// How a line treats a year whose value is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gaps {
    /// Skip the point and join its neighbours.
    Bridge,
    /// End the line at the point and start a new one after it.
    Break,
}

fn calendar_year(year: f64) -> Option<i32> {
    (year.fract() == 0.0 && year.abs() <= MAX_ABS_YEAR).then_some(year as i32)
}

fn country_series(data: &Table, column: &str, gaps: Gaps) -> Result<CountrySeries, AnalysisError> {
    let countries = data.column(COUNTRY_NAME)?;
    let years = data.numeric(TIME)?;
    let values = data.numeric(column)?;

    let series = countries
        .into_iter()
        .zip(years)
        .zip(values)
        .filter_map(|((country, year), value)| {
            Some((country.as_text()?.to_string(), (calendar_year(year?)?, value)))
        })
        .into_group_map()
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .filter_map(|(country, mut points)| {
            points.sort_by_key(|&(year, _)| year);
            let present = |run: &[(i32, Option<f64>)]| -> Vec<(i32, f64)> {
                run.iter().filter_map(|&(year, value)| Some((year, value?))).collect()
            };
            let runs: Vec<Vec<(i32, f64)>> = match gaps {
                Gaps::Bridge => vec![present(&points)],
                Gaps::Break => points.split(|(_, value)| value.is_none()).map(present).collect(),
            }
            .into_iter()
            .filter(|run| !run.is_empty())
            .collect();
            (!runs.is_empty()).then_some((country, runs))
        })
        .collect();
    Ok(series)
}

/// (label, value) slices for a pie; rows with no value or a negative one are left out.
fn pie_slices(data: &Table, column: &str) -> Result<Vec<(String, f64)>, AnalysisError> {
    let labels = data.column(COUNTRY_NAME)?;
    let values = data.numeric(column)?;
    Ok(labels
        .into_iter()
        .zip(values)
        .filter_map(|(label, value)| {
            let value = value.filter(|v| *v >= 0.0)?;
            Some((label.to_string(), value))
        })
        .collect())
}

/// (year, value) bars for one indicator, dropping rows missing either.
fn year_bars(data: &Table, column: &str) -> Result<Vec<(f64, f64)>, AnalysisError> {
    let years = data.numeric(TIME)?;
    let values = data.numeric(column)?;
    Ok(years
        .into_iter()
        .zip(values)
        .filter_map(|(year, value)| Some((year?, value?)))
        .collect())
}

// Value axis always includes zero and leaves headroom above the tallest point.
fn value_range<I: IntoIterator<Item = f64>>(values: I) -> Range<f64> {
    let (min, max) = values
        .into_iter()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let max = if max <= 0.0 { 1.0 } else { max * 1.1 };
    let min = if min < 0.0 { min * 1.1 } else { 0.0 };
    min..max
}

fn draw_country_lines(
    series: &CountrySeries,
    title: &str,
    y_desc: &str,
    output_file: &Path,
) -> Result<(), Box<dyn Error>> {
    let points = || series.iter().flat_map(|(_, runs)| runs.iter().flatten());
    let first_year = points().map(|&(year, _)| year).min().unwrap_or(0);
    let last_year = points().map(|&(year, _)| year).max().unwrap_or(0);
    let y_range = value_range(points().map(|&(_, value)| value));

    let root = BitMapBackend::new(output_file, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(first_year.saturating_sub(1)..last_year.saturating_add(1), y_range)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc(y_desc)
        .x_label_formatter(&|year| year.to_string())
        .draw()?;

    for (idx, (country, runs)) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        for (run_idx, run) in runs.iter().enumerate() {
            let line = chart.draw_series(LineSeries::new(run.iter().copied(), color.stroke_width(2)))?;
            // One legend entry per country.
            if run_idx == 0 {
                line.label(country.as_str())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }
            chart.draw_series(run.iter().map(|&point| Circle::new(point, 4, color.filled())))?;
        }
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_pie(slices: &[(String, f64)], title: &str, output_file: &Path) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(output_file, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", 22))?;

    let (width, height) = root.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;

    let sizes: Vec<f64> = slices.iter().map(|(_, value)| *value).collect();
    let labels: Vec<String> = slices.iter().map(|(label, _)| label.clone()).collect();
    let colors: Vec<RGBColor> = (0..slices.len())
        .map(|idx| {
            let (r, g, b) = Palette99::pick(idx).rgb();
            RGBColor(r, g, b)
        })
        .collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(PIE_START_ANGLE);
    pie.label_style(("sans-serif", 16).into_font().color(&BLACK));
    pie.percentages(("sans-serif", 14).into_font().color(&BLACK));
    root.draw(&pie)?;

    root.present()?;
    Ok(())
}

// Blue through light grey to red, for values in [-1, 1].
fn coolwarm(value: f64) -> RGBColor {
    const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
    const MID: (f64, f64, f64) = (221.0, 221.0, 221.0);
    const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

    let t = value.clamp(-1.0, 1.0);
    let (from, to, w) = if t < 0.0 { (MID, COOL, -t) } else { (MID, WARM, t) };
    let mix = |a: f64, b: f64| (a + (b - a) * w).round() as u8;
    RGBColor(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

fn segment_label(value: &SegmentValue<i32>, names: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(idx) => names.get(*idx as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Line graph of central government debt (% of GDP) per country over time.
pub(crate) fn central_government_debt(data: &Table, output_file: &Path) -> Result<(), Box<dyn Error>> {
    let series = country_series(data, CENTRAL_GOVERNMENT_DEBT, Gaps::Bridge)?;
    if series.is_empty() {
        warn!("No central government debt values to plot, skipping {}", output_file.display());
        return Ok(());
    }
    draw_country_lines(
        &series,
        "Central Government Debt (% of GDP) Over Time",
        "Central Government Debt (% of GDP)",
        output_file,
    )?;
    info!("Line chart saved to {}", output_file.display());
    Ok(())
}

/// Annotated heatmap of a correlation matrix; `labels` name its rows and columns.
pub(crate) fn interest_payments_heatmap(
    corr: &Array2<f64>,
    labels: &[&str],
    output_file: &Path,
) -> Result<(), Box<dyn Error>> {
    let n = corr.nrows();
    if n == 0 {
        warn!("Empty correlation matrix, skipping {}", output_file.display());
        return Ok(());
    }
    let names: Vec<String> = labels.iter().map(|label| label.to_string()).collect();
    // Row 0 sits at the top.
    let flipped: Vec<String> = names.iter().rev().cloned().collect();

    let root = BitMapBackend::new(output_file, (1000, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Correlation Matrix: Interest Payments (% of Expense) vs. Interest Payments (% of Revenue)",
            ("sans-serif", 17),
        )
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(220)
        .build_cartesian_2d(
            (0..n as i32 - 1).into_segmented(),
            (0..n as i32 - 1).into_segmented(),
        )?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n + 1)
        .y_labels(n + 1)
        .x_label_formatter(&|v| segment_label(v, &names))
        .y_label_formatter(&|v| segment_label(v, &flipped))
        .label_style(("sans-serif", 13))
        .draw()?;

    let cells: Vec<(i32, i32, f64)> = corr
        .indexed_iter()
        .map(|((row, col), &value)| (col as i32, (n - 1 - row) as i32, value))
        .collect();
    chart.draw_series(cells.iter().map(|&(x, y, value)| {
        let fill = if value.is_nan() { RGBColor(200, 200, 200) } else { coolwarm(value) };
        Rectangle::new(
            [
                (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
            ],
            fill.filled(),
        )
    }))?;

    let annotation = TextStyle::from(("sans-serif", 20).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));
    chart.draw_series(cells.iter().map(|&(x, y, value)| {
        Text::new(
            format!("{:.2}", value),
            (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
            annotation.clone(),
        )
    }))?;

    root.present()?;
    info!("Heatmap saved to {}", output_file.display());
    Ok(())
}

/// Pie of compensation of employees (% of expense) by country.
pub(crate) fn compensation_of_employees(data: &Table, output_file: &Path) -> Result<(), Box<dyn Error>> {
    let slices = pie_slices(data, COMPENSATION_OF_EMPLOYEES)?;
    if slices.iter().map(|(_, value)| value).sum::<f64>() <= 0.0 {
        warn!("No compensation values to plot, skipping {}", output_file.display());
        return Ok(());
    }
    draw_pie(
        &slices,
        "Pie Chart: Compensation of Employees (% of Expense) by Country",
        output_file,
    )?;
    info!("Pie chart saved to {}", output_file.display());
    Ok(())
}

/// Grouped bars of goods and services expense against grants and other revenue per year.
pub(crate) fn goods_and_grants(data: &Table, output_file: &Path) -> Result<(), Box<dyn Error>> {
    let goods = year_bars(data, GOODS_AND_SERVICES_EXPENSE)?;
    let grants = year_bars(data, GRANTS_AND_OTHER_REVENUE)?;
    if goods.is_empty() && grants.is_empty() {
        warn!("No goods or grants values to plot, skipping {}", output_file.display());
        return Ok(());
    }

    let years = || goods.iter().chain(&grants).map(|&(year, _)| year);
    let first_year = years().fold(f64::INFINITY, f64::min);
    let last_year = years().fold(f64::NEG_INFINITY, f64::max);
    let y_range = value_range(goods.iter().chain(&grants).map(|&(_, value)| value));

    let root = BitMapBackend::new(output_file, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Goods and services expense Vs Grants and other revenue", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(first_year - 1.0..last_year + 1.0, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Percentage")
        .x_label_formatter(&|year| format!("{:.0}", year))
        .draw()?;

    chart
        .draw_series(goods.iter().map(|&(year, value)| {
            Rectangle::new([(year - BAR_WIDTH, 0.0), (year, value)], PINK.filled())
        }))?
        .label("Goods and services expense")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], PINK.filled()));

    chart
        .draw_series(grants.iter().map(|&(year, value)| {
            Rectangle::new([(year, 0.0), (year + BAR_WIDTH, value)], RED.filled())
        }))?
        .label("Grants and other revenue")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], RED.filled()));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    info!("Bar chart saved to {}", output_file.display());
    Ok(())
}

/// Line graph of interest payments (% of expense) per country over time.
pub(crate) fn interest_payments_expense(data: &Table, output_file: &Path) -> Result<(), Box<dyn Error>> {
    let series = country_series(data, INTEREST_PAYMENTS_EXPENSE, Gaps::Break)?;
    if series.is_empty() {
        warn!("No interest payment values to plot, skipping {}", output_file.display());
        return Ok(());
    }
    draw_country_lines(
        &series,
        "Interest payments (% of expense)",
        "Interest payments (% of expense)",
        output_file,
    )?;
    info!("Line chart saved to {}", output_file.display());
    Ok(())
}

/// Pie of interest payments (% of revenue) by country for one year.
pub(crate) fn interest_payments_revenue(
    data: &Table,
    year: i32,
    output_file: &Path,
) -> Result<(), Box<dyn Error>> {
    let slices = pie_slices(data, INTEREST_PAYMENTS_REVENUE)?;
    if slices.iter().map(|(_, value)| value).sum::<f64>() <= 0.0 {
        warn!("No interest payment values for {}, skipping {}", year, output_file.display());
        return Ok(());
    }
    draw_pie(
        &slices,
        &format!("Interest Payments (% of Revenue) in {} by Country", year),
        output_file,
    )?;
    info!("Pie chart saved to {}", output_file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eda_statistics::correlation_matrix;
    use crate::models::{INTERESTED_COUNTRIES, NUMERIC_COLUMNS};
    use crate::test_fixtures::{fiscal_table, fonts_available};
    use tempfile::tempdir;

    fn small_table(csv: &str) -> Table {
        Table::from_reader(csv.as_bytes()).unwrap()
    }

    fn coerced() -> Table {
        let mut table = fiscal_table();
        table.coerce_numeric_columns(&NUMERIC_COLUMNS).unwrap();
        table
    }

    #[test]
    fn series_group_by_country_and_bridge_missing() {
        let series = country_series(&coerced(), CENTRAL_GOVERNMENT_DEBT, Gaps::Bridge).unwrap();
        let names: Vec<&str> = series.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Canada", "Germany", "India", "Sweden"]);
        let india = &series[2].1;
        assert_eq!(india, &vec![vec![(2017, 48.0), (2020, 61.0)]]);
    }

    #[test]
    fn broken_series_split_at_missing_values() {
        let series = country_series(&coerced(), CENTRAL_GOVERNMENT_DEBT, Gaps::Break).unwrap();
        let india = &series[2].1;
        assert_eq!(india, &vec![vec![(2017, 48.0)], vec![(2020, 61.0)]]);
        let canada = &series[0].1;
        assert_eq!(canada, &vec![vec![(2017, 50.0), (2018, 49.0), (2020, 80.0)]]);
    }

    #[test]
    fn out_of_range_years_are_not_plotted() {
        let data = small_table(&format!("{},Time,\"{}\"\nC,3e9,1.0\nC,2017.5,2.0\n", COUNTRY_NAME, CENTRAL_GOVERNMENT_DEBT));
        assert!(country_series(&data, CENTRAL_GOVERNMENT_DEBT, Gaps::Bridge).unwrap().is_empty());

        let dir = tempdir().unwrap();
        let path = dir.path().join("debt.png");
        central_government_debt(&data, &path).unwrap();
        assert!(!path.exists());
        assert_eq!(calendar_year(2020.0), Some(2020));
        assert_eq!(calendar_year(-3e9), None);
    }

    #[test]
    fn pie_slices_drop_missing_and_negative_values() {
        let data = small_table(&format!(
            "{},Time,\"{}\"\nA,2020,-1.0\nB,2020,..\nC,2020,3.0\n",
            COUNTRY_NAME, INTEREST_PAYMENTS_REVENUE
        ));
        let slices = pie_slices(&data, INTEREST_PAYMENTS_REVENUE).unwrap();
        assert_eq!(slices, vec![("C".to_string(), 3.0)]);
    }

    #[test]
    fn zero_total_pie_is_skipped() {
        let data = small_table(&format!(
            "{},Time,\"{}\"\nA,2017,0.0\nB,2017,..\n",
            COUNTRY_NAME, COMPENSATION_OF_EMPLOYEES
        ));
        let dir = tempdir().unwrap();
        let path = dir.path().join("compensation.png");
        compensation_of_employees(&data, &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn empty_matrix_skips_heatmap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heatmap.png");
        interest_payments_heatmap(&Array2::zeros((0, 0)), &[], &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn pie_starts_in_upper_left() {
        let start = PIE_START_ANGLE.to_radians();
        // Screen coordinates: negative x is left, negative y is up.
        assert!(start.cos() < 0.0 && start.sin() < 0.0);
    }

    #[test]
    fn pie_slices_follow_filtered_rows() {
        let data = coerced()
            .filter_year(2017)
            .unwrap()
            .filter_countries(&INTERESTED_COUNTRIES)
            .unwrap();
        let slices = pie_slices(&data, COMPENSATION_OF_EMPLOYEES).unwrap();
        assert_eq!(
            slices,
            vec![
                ("Canada".to_string(), 11.5),
                ("India".to_string(), 9.8),
                ("Sweden".to_string(), 12.8)
            ]
        );
    }

    #[test]
    fn bars_skip_rows_without_year() {
        let bars = year_bars(&coerced(), GRANTS_AND_OTHER_REVENUE).unwrap();
        assert_eq!(bars.len(), 10);
        assert_eq!(bars[0], (2017.0, 1.2));
    }

    #[test]
    fn value_range_spans_zero() {
        let range = value_range([2.0, 10.0]);
        assert_eq!(range.start, 0.0);
        assert!((range.end - 11.0).abs() < 1e-9);
        let range = value_range([-2.0, 4.0]);
        assert!(range.start < -2.0 && range.end > 4.0);
        assert_eq!(value_range(std::iter::empty()), 0.0..1.0);
    }

    #[test]
    fn coolwarm_endpoints() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
    }

    #[test]
    fn every_chart_renders_fixture() {
        if !fonts_available() {
            return;
        }
        let dir = tempdir().unwrap();
        let data = coerced();
        let out = |name: &str| dir.path().join(name);

        central_government_debt(&data, &out("debt.png")).unwrap();
        let corr = correlation_matrix(&data, &[INTEREST_PAYMENTS_EXPENSE, INTEREST_PAYMENTS_REVENUE]).unwrap();
        interest_payments_heatmap(&corr, &["Expense", "Revenue"], &out("heatmap.png")).unwrap();
        let compensation = data
            .filter_year(2017)
            .unwrap()
            .filter_countries(&INTERESTED_COUNTRIES)
            .unwrap();
        compensation_of_employees(&compensation, &out("compensation.png")).unwrap();
        goods_and_grants(&data.filter_year_range(2015..=2020).unwrap(), &out("goods.png")).unwrap();
        interest_payments_expense(&data, &out("expense.png")).unwrap();
        interest_payments_revenue(&data.filter_year(2020).unwrap(), 2020, &out("revenue.png")).unwrap();

        for name in ["debt.png", "heatmap.png", "compensation.png", "goods.png", "expense.png", "revenue.png"] {
            assert!(out(name).exists(), "{} was not written", name);
        }
    }

    #[test]
    fn empty_input_skips_chart() {
        let dir = tempdir().unwrap();
        let empty = coerced().filter_year(1999).unwrap();
        let path = dir.path().join("empty.png");
        central_government_debt(&empty, &path).unwrap();
        interest_payments_revenue(&empty, 1999, &path).unwrap();
        goods_and_grants(&empty, &path).unwrap();
        assert!(!path.exists());
    }
}
