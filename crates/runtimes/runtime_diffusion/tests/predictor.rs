use anyhow::Result;
use candle_core::{DType, Device};
use image::{DynamicImage, Rgb, RgbImage};
use pixstyle_core::{Config, GenerationRequest, Scheduler, SchedulerConfig, SchedulerFamily};
use pixstyle_runtime_api::{
    Backend, DiffusionPipeline, EncoderOptions, Generator, PipelineCall, PipelineOptions,
    Quantization,
};
use pixstyle_runtime_diffusion::Predictor;
use rand::Rng;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const CINEMATIC_NEGATIVE: &str = "anime, cartoon, graphic, text, painting, crayon, graphite, abstract, glitch, deformed, mutated, ugly, disfigured";

#[derive(Debug)]
struct OutOfMemory;

impl std::fmt::Display for OutOfMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CUDA out of memory")
    }
}

impl std::error::Error for OutOfMemory {}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Failure {
    LoadTextEncoder,
    Generate,
    DropLastImage,
}

#[derive(Debug, Clone, PartialEq)]
struct RecordedCall {
    prompt: String,
    negative_prompt: Option<String>,
    width: u32,
    height: u32,
    guidance_scale: f64,
    num_inference_steps: u32,
    num_images_per_prompt: u32,
}

#[derive(Debug, Default)]
struct Recorded {
    text_encoder: Option<(String, EncoderOptions)>,
    pipeline: Option<(String, DType, bool)>,
    scheduler: Option<Scheduler>,
    call: Option<RecordedCall>,
    seed: Option<u64>,
}

#[derive(Clone)]
struct FakeBackend {
    recorded: Arc<Mutex<Recorded>>,
    scheduler_config: SchedulerConfig,
    failure: Option<Failure>,
}

impl FakeBackend {
    fn new() -> Self {
        Self {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            scheduler_config: SchedulerConfig::default(),
            failure: None,
        }
    }

    fn failing(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new()
        }
    }
}

struct FakeTextEncoder;

struct FakePipeline {
    scheduler_config: SchedulerConfig,
    recorded: Arc<Mutex<Recorded>>,
    failure: Option<Failure>,
}

impl Backend for FakeBackend {
    type TextEncoder = FakeTextEncoder;
    type Pipeline = FakePipeline;

    fn load_text_encoder(&self, id: &str, options: &EncoderOptions) -> Result<FakeTextEncoder> {
        if self.failure == Some(Failure::LoadTextEncoder) {
            return Err(OutOfMemory.into());
        }
        self.recorded.lock().unwrap().text_encoder = Some((id.to_string(), options.clone()));
        Ok(FakeTextEncoder)
    }

    fn load_pipeline(
        &self,
        model_id: &str,
        _text_encoder: FakeTextEncoder,
        options: &PipelineOptions,
    ) -> Result<FakePipeline> {
        self.recorded.lock().unwrap().pipeline = Some((
            model_id.to_string(),
            options.dtype,
            options.optimize_text_encoder,
        ));
        Ok(FakePipeline {
            scheduler_config: self.scheduler_config.clone(),
            recorded: self.recorded.clone(),
            failure: self.failure,
        })
    }
}

impl DiffusionPipeline for FakePipeline {
    fn scheduler_config(&self) -> &SchedulerConfig {
        &self.scheduler_config
    }

    fn set_scheduler(&mut self, scheduler: Scheduler) {
        self.scheduler_config = scheduler.config.clone();
        self.recorded.lock().unwrap().scheduler = Some(scheduler);
    }

    fn generate(
        &mut self,
        call: &PipelineCall<'_>,
        generator: &mut Generator,
    ) -> Result<Vec<DynamicImage>> {
        {
            let mut recorded = self.recorded.lock().unwrap();
            recorded.seed = Some(generator.seed());
            recorded.call = Some(RecordedCall {
                prompt: call.prompt.to_string(),
                negative_prompt: call.negative_prompt.map(str::to_string),
                width: call.width,
                height: call.height,
                guidance_scale: call.guidance_scale,
                num_inference_steps: call.num_inference_steps,
                num_images_per_prompt: call.num_images_per_prompt,
            });
        }
        if self.failure == Some(Failure::Generate) {
            anyhow::bail!(OutOfMemory);
        }

        let rng = generator.rng();
        let mut images: Vec<DynamicImage> = (0..call.num_images_per_prompt)
            .map(|_| {
                let mut image = RgbImage::new(call.width, call.height);
                for pixel in image.pixels_mut() {
                    *pixel = Rgb([rng.gen(), rng.gen(), rng.gen()]);
                }
                DynamicImage::ImageRgb8(image)
            })
            .collect();
        if self.failure == Some(Failure::DropLastImage) {
            images.pop();
        }
        Ok(images)
    }
}

fn predictor(backend: FakeBackend) -> (Predictor<FakeBackend>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.output.dir = dir.path().to_path_buf();
    (Predictor::with_device(backend, config, Device::Cpu), dir)
}

fn small_request() -> GenerationRequest {
    GenerationRequest {
        width: 8,
        height: 8,
        ..Default::default()
    }
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

#[test]
fn style_negative_prompt_overrides_user_negative_prompt() {
    let backend = FakeBackend::new();
    let (predictor, _dir) = predictor(backend.clone());

    predictor
        .predict(GenerationRequest {
            prompt: "a dragon".to_string(),
            negative_prompt: Some("blurry".to_string()),
            style_name: "Cinematic".to_string(),
            ..small_request()
        })
        .unwrap();

    let recorded = backend.recorded.lock().unwrap();
    let call = recorded.call.as_ref().unwrap();
    assert_eq!(call.negative_prompt.as_deref(), Some(CINEMATIC_NEGATIVE));
    assert!(call.prompt.starts_with("cinematic still a dragon . "));
}

#[test]
fn three_outputs_are_three_distinct_files() {
    let (predictor, dir) = predictor(FakeBackend::new());

    let paths = predictor
        .predict(GenerationRequest {
            num_outputs: 3,
            ..small_request()
        })
        .unwrap();

    assert_eq!(paths.len(), 3);
    assert_ne!(paths[0], paths[1]);
    assert_ne!(paths[1], paths[2]);
    assert_ne!(paths[0], paths[2]);
    for path in &paths {
        assert!(path.starts_with(dir.path()));
        let image = image::open(path).unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    }
}

#[test]
fn same_seed_gives_identical_images() {
    let request = GenerationRequest {
        style_name: "None".to_string(),
        seed: Some(42),
        num_outputs: 2,
        ..small_request()
    };

    let (first, _first_dir) = predictor(FakeBackend::new());
    let (second, _second_dir) = predictor(FakeBackend::new());
    let first_paths = first.predict(request.clone()).unwrap();
    let second_paths = second.predict(request).unwrap();

    for (a, b) in first_paths.iter().zip(&second_paths) {
        assert_ne!(a, b);
        assert_eq!(std::fs::read(a).unwrap(), std::fs::read(b).unwrap());
    }
}

#[test]
fn different_seeds_give_different_images() {
    let (predictor, _dir) = predictor(FakeBackend::new());

    let first = predictor
        .predict(GenerationRequest {
            seed: Some(1),
            ..small_request()
        })
        .unwrap();
    let first_bytes = std::fs::read(&first[0]).unwrap();
    let second = predictor
        .predict(GenerationRequest {
            seed: Some(2),
            ..small_request()
        })
        .unwrap();

    assert_ne!(first_bytes, std::fs::read(&second[0]).unwrap());
}

#[test]
fn forwards_request_parameters() {
    let backend = FakeBackend::new();
    let (predictor, _dir) = predictor(backend.clone());

    predictor
        .predict(GenerationRequest {
            prompt: "a lighthouse".to_string(),
            negative_prompt: None,
            width: 16,
            height: 8,
            num_inference_steps: 30,
            guidance_scale: 7.0,
            seed: Some(1234),
            ..small_request()
        })
        .unwrap();

    let recorded = backend.recorded.lock().unwrap();
    assert_eq!(
        recorded.call.as_ref().unwrap(),
        &RecordedCall {
            prompt: "a lighthouse".to_string(),
            negative_prompt: None,
            width: 16,
            height: 8,
            guidance_scale: 7.0,
            num_inference_steps: 30,
            num_images_per_prompt: 1,
        }
    );
    assert_eq!(recorded.seed, Some(1234));

    let (encoder_id, encoder_options) = recorded.text_encoder.as_ref().unwrap();
    assert_eq!(encoder_id, "PixArt-alpha/PixArt-XL-2-1024-MS");
    assert_eq!(encoder_options.subfolder, "text_encoder");
    assert_eq!(encoder_options.quantization, Quantization::Int8);
    assert_eq!(
        recorded.pipeline.as_ref().unwrap(),
        &(
            "PixArt-alpha/PixArt-XL-2-1024-MS".to_string(),
            DType::F16,
            true
        )
    );
}

#[test]
fn custom_model_flags_substitute_identifiers() {
    let backend = FakeBackend::new();
    let (predictor, _dir) = predictor(backend.clone());

    predictor
        .predict(GenerationRequest {
            model_id: "PixArt-alpha/PixArt-XL-2-512x512".to_string(),
            use_custom_model: true,
            custom_model: "me/pixart-finetune".to_string(),
            text_encoder_id: "PixArt-alpha/PixArt-LCM-XL-2-1024-MS".to_string(),
            ..small_request()
        })
        .unwrap();

    let recorded = backend.recorded.lock().unwrap();
    assert_eq!(recorded.pipeline.as_ref().unwrap().0, "me/pixart-finetune");
    assert_eq!(
        recorded.text_encoder.as_ref().unwrap().0,
        "PixArt-alpha/PixArt-LCM-XL-2-1024-MS"
    );
}

#[test]
fn scheduler_is_built_from_pipeline_config() {
    let mut backend = FakeBackend::new();
    backend.scheduler_config.num_train_timesteps = 777;
    backend
        .scheduler_config
        .extra
        .insert("solver_order".to_string(), 3.into());
    let (predictor, _dir) = predictor(backend.clone());

    predictor
        .predict(GenerationRequest {
            scheduler_name: "KarrasDPM".to_string(),
            ..small_request()
        })
        .unwrap();

    let recorded = backend.recorded.lock().unwrap();
    let scheduler = recorded.scheduler.as_ref().unwrap();
    assert_eq!(scheduler.family, SchedulerFamily::DpmSolverMultistep);
    assert_eq!(scheduler.config.use_karras_sigmas, Some(true));
    assert_eq!(scheduler.config.num_train_timesteps, 777);
    assert_eq!(scheduler.config.extra["solver_order"], 3);
}

#[test]
fn random_seed_is_32_bit() {
    let backend = FakeBackend::new();
    let (predictor, _dir) = predictor(backend.clone());

    predictor.predict(small_request()).unwrap();

    let seed = backend.recorded.lock().unwrap().seed.unwrap();
    assert!(seed <= u32::MAX as u64);
}

#[test]
fn unknown_style_fails_before_loading() {
    let backend = FakeBackend::new();
    let (predictor, dir) = predictor(backend.clone());

    let err = predictor
        .predict(GenerationRequest {
            style_name: "Watercolor".to_string(),
            ..small_request()
        })
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<pixstyle_core::Error>(),
        Some(pixstyle_core::Error::UnknownStyle(name)) if name == "Watercolor"
    ));
    assert!(backend.recorded.lock().unwrap().text_encoder.is_none());
    assert!(dir_is_empty(dir.path()));
}

#[test]
fn unknown_scheduler_fails_before_loading() {
    let backend = FakeBackend::new();
    let (predictor, _dir) = predictor(backend.clone());

    let err = predictor
        .predict(GenerationRequest {
            scheduler_name: "LMS".to_string(),
            ..small_request()
        })
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<pixstyle_core::Error>(),
        Some(pixstyle_core::Error::UnknownScheduler(_))
    ));
    assert!(backend.recorded.lock().unwrap().pipeline.is_none());
}

#[test]
fn load_errors_propagate_unchanged() {
    let (predictor, dir) = predictor(FakeBackend::failing(Failure::LoadTextEncoder));

    let err = predictor.predict(small_request()).unwrap_err();

    assert!(err.downcast_ref::<OutOfMemory>().is_some());
    assert!(dir_is_empty(dir.path()));
}

#[test]
fn generation_errors_propagate_unchanged() {
    let (predictor, dir) = predictor(FakeBackend::failing(Failure::Generate));

    let err = predictor
        .predict(GenerationRequest {
            num_outputs: 2,
            ..small_request()
        })
        .unwrap_err();

    assert_eq!(err.to_string(), "CUDA out of memory");
    assert!(dir_is_empty(dir.path()));
}

#[test]
fn short_output_writes_nothing() {
    let (predictor, dir) = predictor(FakeBackend::failing(Failure::DropLastImage));

    let err = predictor
        .predict(GenerationRequest {
            num_outputs: 3,
            ..small_request()
        })
        .unwrap_err();

    assert!(err.to_string().contains("returned 2 images, expected 3"));
    assert!(dir_is_empty(dir.path()));
}

#[test]
fn failed_save_leaves_no_images() {
    let (predictor, dir) = predictor(FakeBackend::new());
    std::fs::create_dir(predictor.config().output_path(1)).unwrap();

    let err = predictor
        .predict(GenerationRequest {
            num_outputs: 2,
            ..small_request()
        })
        .unwrap_err();

    assert!(err.to_string().contains("Failed to save image"));
    assert!(!predictor.config().output_path(0).exists());
    assert!(dir.path().join("out-1.png").is_dir());
}

#[test]
fn cpu_config_selects_cpu_device() {
    let mut config = Config::default();
    config.device.cpu = true;
    let predictor = Predictor::new(FakeBackend::new(), config).unwrap();
    assert!(predictor.config().device.cpu);
}
