//! The set of metaballs and its per-tick update.

use glam::{Vec2, Vec3};
use rand::Rng;

use super::source::Source;
use crate::consts::AREA_PER_SOURCE;

/// Number of sources for a viewport: one per `AREA_PER_SOURCE` square pixels,
/// rounded half up.
pub fn source_count(width: u32, height: u32) -> usize {
    (f64::from(width) * f64::from(height) / AREA_PER_SOURCE).round() as usize
}

/// Ordered `(x, y, r)` triples, one per source, in field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub entries: Vec<Vec3>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten to `3 * len` floats: `x0, y0, r0, x1, y1, r1, ...`
    pub fn packed(&self) -> Vec<f32> {
        self.entries.iter().flat_map(|e| e.to_array()).collect()
    }
}

/// All metaballs of one viewport.
///
/// Bounds are fixed at creation; a resized canvas needs a new field.
#[derive(Debug, Clone)]
pub struct Field {
    width: u32,
    height: u32,
    sources: Vec<Source>,
}

impl Field {
    /// Spawn `source_count(width, height)` random sources.
    pub fn new<R: Rng + ?Sized>(width: u32, height: u32, rng: &mut R) -> Self {
        let count = source_count(width, height);
        let (w, h) = (width as f32, height as f32);
        let sources = (0..count).map(|_| Source::spawn(rng, w, h)).collect();
        Self::from_sources(width, height, sources)
    }

    /// Build a field from explicit sources.
    pub fn from_sources(width: u32, height: u32, sources: Vec<Source>) -> Self {
        Self {
            width,
            height,
            sources,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Advance every source by one tick.
    pub fn advance(&mut self) {
        let bounds = Vec2::new(self.width as f32, self.height as f32);
        for source in &mut self.sources {
            source.step(bounds);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: self
                .sources
                .iter()
                .map(|s| s.center.extend(s.radius))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_source_count() {
        assert_eq!(source_count(800, 600), 30);
        assert_eq!(source_count(1920, 1080), 130);
        // 8000 / 16000 = 0.5 rounds up
        assert_eq!(source_count(100, 80), 1);
        assert_eq!(source_count(100, 79), 0);
        assert_eq!(source_count(0, 600), 0);
    }

    #[test]
    fn test_new_spawns_counted_sources() {
        let mut rng = Pcg32::seed_from_u64(42);
        let field = Field::new(800, 600, &mut rng);
        assert_eq!(field.len(), 30);
        assert_eq!(field.snapshot().len(), 30);
    }

    #[test]
    fn test_same_seed_same_field() {
        let a = Field::new(640, 480, &mut Pcg32::seed_from_u64(9));
        let b = Field::new(640, 480, &mut Pcg32::seed_from_u64(9));
        assert_eq!(a.sources(), b.sources());
    }

    #[test]
    fn test_snapshot_packs_in_source_order() {
        let field = Field::from_sources(
            400,
            400,
            vec![
                Source::new(Vec2::new(1.0, 2.0), Vec2::ZERO, 3.0),
                Source::new(Vec2::new(4.0, 5.0), Vec2::ZERO, 6.0),
            ],
        );
        assert_eq!(
            field.snapshot().packed(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn test_snapshot_length_is_stable() {
        let mut field = Field::new(1024, 768, &mut Pcg32::seed_from_u64(3));
        let n = field.len();
        for _ in 0..1000 {
            field.advance();
            assert_eq!(field.snapshot().packed().len(), 3 * n);
        }
    }

    #[test]
    fn test_sources_stay_near_bounds_over_time() {
        // Reflection keeps every source within one tick of travel of its bounds
        let mut field = Field::new(800, 600, &mut Pcg32::seed_from_u64(11));
        for _ in 0..5000 {
            field.advance();
        }
        for s in field.sources() {
            let slack = 2.0 * s.velocity.abs().max_element() + 1e-3;
            assert!(s.center.x >= s.radius - slack && s.center.x <= 800.0 - s.radius + slack);
            assert!(s.center.y >= s.radius - slack && s.center.y <= 600.0 - s.radius + slack);
        }
    }

    #[test]
    fn test_overshoot_scenario() {
        let mut field = Field::from_sources(
            400,
            400,
            vec![Source::new(Vec2::new(200.0, 200.0), Vec2::new(3.0, 0.0), 40.0)],
        );

        // 200 + 3 * 53 = 359, still inside the 360 bound
        for _ in 0..53 {
            field.advance();
        }
        assert_eq!(field.sources()[0].center.x, 359.0);
        assert_eq!(field.sources()[0].velocity.x, 3.0);

        // First crossing: x keeps going to 362 and the velocity flips
        field.advance();
        assert_eq!(field.sources()[0].center.x, 362.0);
        assert_eq!(field.sources()[0].velocity.x, -3.0);

        // Then it heads back in
        field.advance();
        assert_eq!(field.sources()[0].center.x, 359.0);
        assert_eq!(field.sources()[0].velocity.x, -3.0);
        assert_eq!(field.sources()[0].center.y, 200.0);
        assert_eq!(field.sources()[0].velocity.y, 0.0);
    }
}
