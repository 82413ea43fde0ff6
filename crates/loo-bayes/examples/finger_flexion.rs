//! Finger-flexion decoding example.
//!
//! Simulates band-power features for five fingers over eight channels and
//! decodes the flexed finger with leave-one-out Gaussian Naive Bayes, with
//! and without per-fold z-scoring. A last run drops a few trials to NaN and
//! imputes them per fold.
//!
//! Run with:
//! ```bash
//! RUST_LOG=loo_bayes=info cargo run --example finger_flexion
//! ```

use loo_bayes::testing::{affine_columns, clustered_trials, with_missing_trials};
use loo_bayes::{LeaveOneOut, LeaveOneOutConfig, NanPolicy};
use tracing_subscriber::EnvFilter;

const FINGERS: [&str; 5] = ["thumb", "index", "middle", "ring", "little"];

fn main() -> loo_bayes::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // =========================================================================
    // Simulated trials
    // =========================================================================
    // 12 trials per finger, 8 channels. Channels record power on very
    // different scales, which is what normalization is for.
    let (power, finger_idx) = clustered_trials(FINGERS.len(), 12, 8, 1.5, 2024);
    let scales: Vec<(f64, f64)> = (0..8).map(|c| (10f64.powi(c - 3), 50.0 * c as f64)).collect();
    let power = affine_columns(&power, &scales);
    let labels: Vec<&str> = finger_idx.iter().map(|&i| FINGERS[i as usize]).collect();

    // =========================================================================
    // Leave-one-out decoding
    // =========================================================================
    for normalize in [false, true] {
        let config = LeaveOneOutConfig::builder().normalize(normalize).build()?;
        let cv = LeaveOneOut::new(config).classify(power.view(), &labels)?;
        let confusion = cv.confusion();

        println!("\n=== normalize = {normalize} ===");
        println!("accuracy: {:.1}%", 100.0 * cv.accuracy());

        print!("{:>8}", "");
        for label in confusion.labels() {
            print!("{label:>8}");
        }
        println!();
        for (label, row) in confusion.labels().iter().zip(confusion.counts().rows()) {
            print!("{label:>8}");
            for count in row {
                print!("{count:>8}");
            }
            println!();
        }

        for (label, recall) in confusion.labels().iter().zip(confusion.recall()) {
            println!("  recall {label:<7} {recall:.2}");
        }
    }

    // =========================================================================
    // Dropped trials
    // =========================================================================
    // Artifact-rejected trials arrive as NaN rows. Mixup rebuilds them inside
    // each fold from complete training trials of the same finger.
    let dropped = with_missing_trials(&power, &[3, 17, 42]);
    let config = LeaveOneOutConfig::builder()
        .normalize(true)
        .nan_policy(NanPolicy::mixup())
        .build()?;
    let cv = LeaveOneOut::new(config).classify(dropped.view(), &labels)?;
    println!("\n=== 3 NaN trials, mixup ===");
    println!("accuracy: {:.1}%", 100.0 * cv.accuracy());
    println!("imputed per fold: {}", cv.imputed_rows()[0]);

    Ok(())
}
