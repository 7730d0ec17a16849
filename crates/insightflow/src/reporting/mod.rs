//! PDF report assembly.
//!
//! [`ReportAssembler::build`] turns summary statistics, a dataset preview and
//! rendered chart images into a paginated US Letter PDF:
//!
//! - header with title, banner, generation timestamp and an accent rule
//! - "Intelligence Summary" metric table
//! - "Raw Data Sample" table (first 12 rows by first 6 columns by default)
//! - "Visual Intelligence" section on a new page, one image per chart
//! - footer with `Page N` on every page
//!
//! Layout is done by [`layout::paginate`], which works on plain
//! [`layout::Flowable`] values and can be inspected without producing a PDF.
//!
//! # Example
//!
//! ```rust,ignore
//! use insightflow::reporting::ReportAssembler;
//! use insightflow::config::ReportSpec;
//!
//! let spec = ReportSpec::new("Sales Overview", "out/report.pdf");
//! let outcome = ReportAssembler::default().build(&spec, &stats, &df, &charts)?;
//! println!("{} pages", outcome.page_count);
//! ```

mod assembler;
pub mod layout;
mod pdf;

pub use assembler::ReportAssembler;
