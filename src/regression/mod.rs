// Compliance regression detection between a baseline result and the latest one
//
// The baseline ("threshold") is the result an operator or a previous passing
// run accepted. A regression is any control-target that was satisfied there
// and is not satisfied now, including targets that stopped being reported.
// Improvements and newly reported targets are surfaced but never fail the run.

mod classifier;

pub use classifier::{
    evaluate, findings_by_target, Classification, ClassifyError, FindingBucket,
};
