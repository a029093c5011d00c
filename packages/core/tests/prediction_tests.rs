//! End-to-end prediction behaviour with an in-process classifier.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use style_predict::{
    Classifier, NO_MATCH_LABEL, PredictError, ServingContext, ServingOptions, StartupError,
};

/// Scores every image the same: A 0.6, B 0.3, C 0.1.
struct FixedScores;

impl Classifier for FixedScores {
    fn num_classes(&self) -> usize {
        3
    }

    fn logits(&self, _batch: Array4<f32>) -> Result<Vec<f32>, PredictError> {
        Ok(vec![0.6f32.ln(), 0.3f32.ln(), 0.1f32.ln()])
    }
}

/// Logits derived from per-channel means, so different images rank differently.
struct ChannelMeans {
    classes: usize,
}

impl Classifier for ChannelMeans {
    fn num_classes(&self) -> usize {
        self.classes
    }

    fn logits(&self, batch: Array4<f32>) -> Result<Vec<f32>, PredictError> {
        let plane = (batch.shape()[2] * batch.shape()[3]) as f32;
        let means: Vec<f32> = (0..3)
            .map(|c| batch.index_axis(ndarray::Axis(1), c).sum() / plane)
            .collect();
        Ok((0..self.classes)
            .map(|k| means[k % 3] * (k as f32 + 1.0) - k as f32 * 0.1)
            .collect())
    }
}

struct Fixture {
    dir: PathBuf,
}

impl Fixture {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "style-predict-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn options(&self, dataset: Option<PathBuf>, threshold: f32) -> ServingOptions {
        ServingOptions {
            model_path: self.dir.join("model.onnx"),
            dataset_path: dataset,
            labels_path: None,
            threshold,
            input_size: 16,
            intra_threads: None,
            display_language: None,
            display_names_path: None,
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn png_bytes(image: RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

const ABC: &str = "image,style\nx.jpg,C\ny.jpg,A\nz.jpg,B\nw.jpg,A\n";

#[test]
fn test_scenario_threshold_low_returns_three() {
    let fx = Fixture::new("low");
    let dataset = fx.write("data.csv", ABC);
    let ctx =
        ServingContext::with_classifier(Arc::new(FixedScores), &fx.options(Some(dataset), 0.3))
            .unwrap();

    let image = png_bytes(RgbImage::from_pixel(20, 10, Rgb([200, 10, 10])));
    let top3 = ctx.service().predict_bytes(&image).unwrap();

    assert_eq!(top3.len(), 3);
    assert_eq!(top3[0].label, "A");
    assert_eq!(top3[0].confidence, 0.6);
    assert_eq!(top3[1].label, "B");
    assert_eq!(top3[2].label, "C");
}

#[test]
fn test_scenario_threshold_high_returns_sentinel() {
    let fx = Fixture::new("high");
    let dataset = fx.write("data.csv", ABC);
    let ctx =
        ServingContext::with_classifier(Arc::new(FixedScores), &fx.options(Some(dataset), 0.7))
            .unwrap();

    let image = png_bytes(RgbImage::from_pixel(20, 10, Rgb([200, 10, 10])));
    let result = ctx.service().predict_bytes(&image).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].label, NO_MATCH_LABEL);
    assert_eq!(result[0].confidence, 0.6);
}

#[test]
fn test_same_image_is_bit_identical() {
    let fx = Fixture::new("determinism");
    let dataset = fx.write(
        "data.csv",
        "image,style\n1,Baroque\n2,Cubism\n3,Dada\n4,Fauvism\n5,Rococo\n",
    );
    let ctx = ServingContext::with_classifier(
        Arc::new(ChannelMeans { classes: 5 }),
        &fx.options(Some(dataset), 0.0),
    )
    .unwrap();

    let image = png_bytes(RgbImage::from_fn(33, 21, |x, y| {
        Rgb([(x * 5) as u8, (y * 9) as u8, ((x * y) % 255) as u8])
    }));
    let first = ctx.service().predict_bytes(&image).unwrap();
    let second = ctx.service().predict_bytes(&image).unwrap();

    assert_eq!(first, second);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.confidence.to_bits(), b.confidence.to_bits());
    }
}

#[test]
fn test_result_properties() {
    let fx = Fixture::new("properties");
    let dataset = fx.write(
        "data.csv",
        "image,style\n1,Baroque\n2,Cubism\n3,Dada\n4,Fauvism\n5,Rococo\n6,Ukiyo-e\n",
    );
    let ctx = ServingContext::with_classifier(
        Arc::new(ChannelMeans { classes: 6 }),
        &fx.options(Some(dataset), 0.0),
    )
    .unwrap();

    for color in [[0, 0, 0], [255, 255, 255], [255, 0, 0], [12, 200, 90]] {
        let image = png_bytes(RgbImage::from_pixel(8, 8, Rgb(color)));
        let result = ctx.service().predict_bytes(&image).unwrap();

        assert_eq!(result.len(), 3);
        let sum: f32 = result.iter().map(|r| r.confidence).sum();
        assert!(sum <= 1.0 + 1e-3, "sum {sum} for {color:?}");
        assert!(result.iter().all(|r| (0.0..=1.0).contains(&r.confidence)));
        assert!(result.windows(2).all(|w| w[0].confidence >= w[1].confidence));

        let mut labels: Vec<&str> = result.iter().map(|r| r.label.as_str()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 3);
    }
}

#[test]
fn test_persisted_labels_must_match_dataset() {
    let fx = Fixture::new("labels-mismatch");
    let dataset = fx.write("data.csv", ABC);
    let labels = fx.write("labels.json", r#"["A","C","B"]"#);

    let mut options = fx.options(Some(dataset), 0.3);
    options.labels_path = Some(labels);

    let err = ServingContext::with_classifier(Arc::new(FixedScores), &options)
        .err()
        .unwrap();
    assert!(matches!(err, StartupError::LabelMismatch { index: 1, .. }));
}

#[test]
fn test_persisted_labels_without_dataset() {
    let fx = Fixture::new("labels-only");
    let labels = fx.write("labels.json", r#"["A","B","C"]"#);

    let mut options = fx.options(None, 0.3);
    options.labels_path = Some(labels);

    let ctx = ServingContext::with_classifier(Arc::new(FixedScores), &options).unwrap();
    assert_eq!(ctx.service().catalog().labels(), &["A", "B", "C"]);
}

#[test]
fn test_missing_dataset_is_fatal() {
    let fx = Fixture::new("missing");
    let options = fx.options(Some(fx.dir.join("nope.csv")), 0.3);
    let err = ServingContext::with_classifier(Arc::new(FixedScores), &options)
        .err()
        .unwrap();
    assert!(matches!(err, StartupError::Dataset { .. }));
}

#[test]
fn test_no_label_source_is_fatal() {
    let fx = Fixture::new("no-source");
    let err = ServingContext::with_classifier(Arc::new(FixedScores), &fx.options(None, 0.3))
        .err()
        .unwrap();
    assert!(matches!(err, StartupError::NoLabelSource));
}

#[test]
fn test_label_count_mismatch_is_fatal() {
    let fx = Fixture::new("width");
    let dataset = fx.write("data.csv", "image,style\n1,A\n2,B\n");
    let err = ServingContext::with_classifier(Arc::new(FixedScores), &fx.options(Some(dataset), 0.3))
        .err()
        .unwrap();
    assert!(matches!(
        err,
        StartupError::DimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));
}

#[test]
fn test_display_language_translates_labels() {
    let fx = Fixture::new("display");
    let dataset = fx.write(
        "data.csv",
        "image,style\n1,Impressionism\n2,Baroque\n3,Cubism\n",
    );
    let names = fx.write("names.json", r#"{"Cubism":"큐비즘"}"#);

    let mut options = fx.options(Some(dataset), 0.0);
    options.display_language = Some("ko".to_string());
    options.display_names_path = Some(names);

    // index 0 = Baroque, 1 = Cubism, 2 = Impressionism
    let ctx = ServingContext::with_classifier(Arc::new(FixedScores), &options).unwrap();
    let image = png_bytes(RgbImage::new(4, 4));
    let result = ctx.service().predict_bytes(&image).unwrap();

    let labels: Vec<&str> = result.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["바로크", "큐비즘", "인상주의"]);
}
