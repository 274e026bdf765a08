use std::convert::TryFrom;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::prelude::*;

use panelvis::{
    catalog::CATALOG,
    classifier::FeatureVector,
    image::{HsvImage, RawImage},
    normalizer::{NormalizedFrame, CANONICAL_HEIGHT, CANONICAL_WIDTH},
};

fn random_image(width: u32, height: u32) -> RawImage {
    let mut data = vec![0u8; width as usize * height as usize * RawImage::CHANNELS];

    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut data);

    RawImage::try_from((data, width, height)).unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let image = random_image(CANONICAL_WIDTH, CANONICAL_HEIGHT);

    c.bench_function(
        &format!("hsv {} x {}", CANONICAL_WIDTH, CANONICAL_HEIGHT),
        |b| b.iter(|| HsvImage::from(&image)),
    );

    c.bench_function(&format!("classify {} regions", CATALOG.len()), |b| {
        let frame = NormalizedFrame::new(image.clone());
        // Convert once, outside of the measurement
        frame.hsv();

        b.iter(|| FeatureVector::evaluate(&CATALOG, Some(&frame)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
