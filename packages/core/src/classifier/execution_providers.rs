//! Execution Provider Configuration for ONNX Runtime
//!
//! Registers every accelerator compiled into this build, in order of
//! preference, on a session builder. ONNX Runtime skips providers that fail to
//! register on the current machine, so CPU is always the final fallback.
//!
//! # Supported Execution Providers
//!
//! - **TensorRT**: NVIDIA GPUs with TensorRT
//! - **CUDA**: NVIDIA GPUs
//! - **CoreML**: Apple Neural Engine and GPU
//! - **DirectML**: Windows GPUs via DirectX 12
//! - **XNNPACK**: Optimized CPU kernels for ARM and x86
//! - **CPU**: Always available
//!
//! Accelerators are opt-in cargo features (`cuda`, `tensorrt`, `coreml`,
//! `directml`, `xnnpack`).

use ort::execution_providers::ExecutionProviderDispatch;

/// Providers requested for a session, in priority order.
#[derive(Debug, Clone, Default)]
pub struct ExecutionProviderInfo {
    /// Requested providers, CPU last
    pub providers: Vec<String>,
    /// Whether any GPU/NPU provider was requested
    pub accelerated: bool,
}

/// Collect the compiled-in execution providers.
///
/// TensorRT > CUDA > CoreML > DirectML > XNNPACK > CPU
#[allow(unused_mut)]
pub fn execution_providers() -> (Vec<ExecutionProviderDispatch>, ExecutionProviderInfo) {
    let mut eps: Vec<ExecutionProviderDispatch> = Vec::new();
    let mut providers: Vec<String> = Vec::new();

    #[cfg(feature = "tensorrt")]
    {
        eps.push(ort::execution_providers::TensorRTExecutionProvider::default().build());
        providers.push("TensorRT".to_string());
    }

    #[cfg(feature = "cuda")]
    {
        eps.push(ort::execution_providers::CUDAExecutionProvider::default().build());
        providers.push("CUDA".to_string());
    }

    #[cfg(feature = "coreml")]
    {
        eps.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
        providers.push("CoreML".to_string());
    }

    #[cfg(feature = "directml")]
    {
        eps.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
        providers.push("DirectML".to_string());
    }

    #[cfg(feature = "xnnpack")]
    {
        eps.push(ort::execution_providers::XNNPACKExecutionProvider::default().build());
        providers.push("XNNPACK".to_string());
    }

    let accelerated = providers.iter().any(|p| p != "XNNPACK");
    providers.push("CPU".to_string());

    if eps.is_empty() {
        tracing::info!("No GPU/NPU execution provider compiled in, using CPU");
    } else {
        tracing::info!(providers = ?providers, "Requesting execution providers");
    }

    (
        eps,
        ExecutionProviderInfo {
            providers,
            accelerated,
        },
    )
}
