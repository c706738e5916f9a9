use rand::rngs::StdRng;
use rand::{SeedableRng, seq::SliceRandom};

use crate::ml::logreg::TrainingConfigError;

/// Shuffle `rows` with a seeded RNG, then cut them into train and test parts.
///
/// The first `floor(len * (1 - test_fraction))` shuffled rows form the train
/// part and the rest the test part.
pub fn train_test_split<T>(
    mut rows: Vec<T>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<T>, Vec<T>), TrainingConfigError> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(TrainingConfigError::TestFraction(test_fraction));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);
    let split_idx = ((rows.len() as f64) * (1.0 - test_fraction)) as usize;
    let test = rows.split_off(split_idx.min(rows.len()));
    Ok((rows, test))
}
