// Everything pseudo-random in a painting comes from here: the per-bristle
// randoms that shape each brush.
//
// Passing a seed through the settings makes the brush shapes reproducible,
// which the tests rely on.

use rand::distributions::Alphanumeric;
use rand::prelude::*;
use rand_pcg::Pcg32;
use rand_seeder::Seeder;

pub type FRng = Pcg32;

pub fn from_seed(optional_seed: &Option<String>) -> FRng {
    let seed = optional_seed.as_ref().cloned().unwrap_or_else(|| {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect()
    });

    log::debug!("🎲 Seeding brush randoms with {:?}", seed);

    Seeder::from(seed).make_rng()
}

/// Uniform values in `[0, 1)`, four per texel.
pub fn texel_randoms(rng: &mut FRng, texel_count: usize) -> Vec<f32> {
    (0..texel_count * 4).map(|_| rng.gen::<f32>()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_seed_gives_same_randoms() {
        let seed = Some("bristles".to_string());
        let a = texel_randoms(&mut from_seed(&seed), 16);
        let b = texel_randoms(&mut from_seed(&seed), 16);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.iter().all(|r| (0.0..1.0).contains(r)));
    }
}
