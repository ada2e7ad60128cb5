use std::io::Write;

use plotters::prelude::*;
use tempfile::NamedTempFile;

use crate::load_clean::Table;

// Ten data rows, one `..` placeholder (India 2018 debt) and the three footer
// lines the World Bank exporter appends.
pub(crate) const FISCAL_CSV: &str = "\
Country Name,Country Code,Time,Time Code,\"Central government debt, total (% of GDP) [GC.DOD.TOTL.GD.ZS]\",Interest payments (% of expense),Interest payments (% of revenue),Compensation of employees (% of expense) [GC.XPN.COMP.ZS],Goods and services expense (% of expense) [GC.XPN.GSRV.ZS],Grants and other revenue (% of revenue) [GC.REV.GOTR.ZS]
Canada,CAN,2017,YR2017,50.0,6.0,6.4,11.5,9.1,1.2
Canada,CAN,2018,YR2018,49.0,5.9,6.1,11.4,9.0,1.1
Canada,CAN,2020,YR2020,80.0,4.1,5.0,10.9,8.2,1.4
India,IND,2017,YR2017,48.0,24.0,26.2,9.8,8.5,3.1
India,IND,2018,YR2018,..,24.5,27.0,9.5,8.6,2.9
India,IND,2020,YR2020,61.0,23.0,28.5,8.9,7.9,3.0
Sweden,SWE,2017,YR2017,35.0,1.2,1.3,12.8,17.2,2.0
Sweden,SWE,2020,YR2020,40.0,0.8,0.8,12.1,16.6,2.4
Germany,DEU,2017,YR2017,50.0,2.0,2.1,7.8,5.1,1.0
Germany,DEU,2020,YR2020,55.0,1.5,1.4,7.1,5.3,1.2
,,,,,,,,,
Data from database: World Development Indicators,,,,,,,,,
Last Updated: 10/26/2023
";

pub(crate) const FIXTURE_ROWS: usize = 13;

pub(crate) fn fiscal_csv_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp csv");
    file.write_all(FISCAL_CSV.as_bytes()).expect("write temp csv");
    file
}

pub(crate) fn fiscal_table() -> Table {
    Table::from_reader(FISCAL_CSV.as_bytes()).expect("fixture parses")
}

/// Text layout needs a system font; bare CI images often have none.
pub(crate) fn fonts_available() -> bool {
    let available = ("sans-serif", 12).into_font().box_size("2017").is_ok();
    if !available {
        eprintln!("no usable system font, skipping chart rendering");
    }
    available
}
