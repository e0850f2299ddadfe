//! Period validation for the training / testing / simulation split

use crate::models::{RangeValidation, ValidateRangesRequest};
use crate::store::Dataset;

use super::range_count::count_ranges;

pub const MSG_NO_DATASET: &str = "No dataset uploaded.";
pub const MSG_START_AFTER_END: &str = "Start date cannot be after end date for a period.";
pub const MSG_OUT_OF_BOUNDS: &str = "Selected dates are outside the dataset's range.";
pub const MSG_OVERLAP: &str = "Date periods must be sequential and non-overlapping.";
pub const MSG_VALID: &str = "Date ranges validated successfully!";

/// Validate the three windows against the current dataset.
///
/// Rejections are ordinary values with zeroed counts. Checks are fail-fast
/// in this order: ordering within each window, dataset bounds, then strict
/// sequencing between windows (touching windows are rejected).
pub fn validate_ranges(req: &ValidateRangesRequest, dataset: Option<&Dataset>) -> RangeValidation {
    let Some((min, max)) = dataset.and_then(Dataset::bounds) else {
        return RangeValidation::rejected(MSG_NO_DATASET);
    };

    let windows = [&req.training_period, &req.testing_period, &req.simulation_period];
    if windows.iter().any(|w| !w.is_ordered()) {
        return RangeValidation::rejected(MSG_START_AFTER_END);
    }

    if req.training_period.start < min || req.simulation_period.end > max {
        return RangeValidation::rejected(MSG_OUT_OF_BOUNDS);
    }

    if req.training_period.end >= req.testing_period.start
        || req.testing_period.end >= req.simulation_period.start
    {
        return RangeValidation::rejected(MSG_OVERLAP);
    }

    let rows = dataset.map(Dataset::rows).unwrap_or_default();
    let (record_counts, monthly_counts) = count_ranges(req, rows);

    RangeValidation {
        is_valid: true,
        message: MSG_VALID.to_string(),
        record_counts,
        monthly_counts,
    }
}
