//! Where per-product artifacts and reports live.

use std::path::{Path, PathBuf};

/// File name of the per-product comparison report.
pub const REPORT_FILE_NAME: &str = "comparison_report.txt";

/// Deterministic on-disk locations under the distribution directory.
///
/// ```text
/// <dist_dir>/<report_dir_name>/<product>/comparison_report.txt
/// <dist_dir>/<report_dir_name>/<product>/<variant slug>/...
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    dist_dir: PathBuf,
    report_dir_name: String,
}

impl ReportLayout {
    /// Create a layout rooted at `dist_dir`.
    pub fn new(dist_dir: impl Into<PathBuf>, report_dir_name: impl Into<String>) -> Self {
        Self {
            dist_dir: dist_dir.into(),
            report_dir_name: report_dir_name.into(),
        }
    }

    /// The distribution directory builds copy their outputs into.
    #[must_use]
    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }

    /// Directory holding everything for one product.
    #[must_use]
    pub fn product_dir(&self, product: &str) -> PathBuf {
        self.dist_dir.join(&self.report_dir_name).join(product)
    }

    /// Directory holding one variant's collected artifacts.
    #[must_use]
    pub fn variant_dir(&self, product: &str, slug: &str) -> PathBuf {
        self.product_dir(product).join(slug)
    }

    /// Comparison report of one product.
    #[must_use]
    pub fn report_path(&self, product: &str) -> PathBuf {
        self.product_dir(product).join(REPORT_FILE_NAME)
    }
}
