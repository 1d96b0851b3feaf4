//! Model loading from safetensors artifacts.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::debug;

use super::network::{FatigueCnn, PARAMETER_GROUPS};

/// Loads a safetensors file into a `VarBuilder`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the safetensors data is
/// invalid, or a tensor uses an unsupported dtype.
pub fn load_safetensors(path: impl AsRef<Path>, device: &Device) -> Result<VarBuilder<'static>> {
    let path = path.as_ref();
    debug!("Loading safetensors from {}", path.display());

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read model file: {}", path.display()))?;

    let tensors = SafeTensors::deserialize(&data)
        .with_context(|| format!("Failed to parse safetensors: {}", path.display()))?;

    let mut tensor_map: HashMap<String, Tensor> = HashMap::new();
    for (name, view) in tensors.tensors() {
        let dtype = to_candle_dtype(view.dtype())?;
        let tensor = Tensor::from_raw_buffer(view.data(), dtype, view.shape(), device)
            .with_context(|| format!("Failed to create tensor '{name}'"))?;
        tensor_map.insert(name, tensor);
    }

    check_parameter_groups(&tensor_map)
        .with_context(|| format!("Not a fatigue model artifact: {}", path.display()))?;
    debug!("Loaded {} tensors", tensor_map.len());

    Ok(VarBuilder::from_tensors(tensor_map, DType::F32, device))
}

/// Loads the fatigue network for the given input resolution.
///
/// Shape mismatches between the artifact and `input_size` surface here.
pub fn load_fatigue_cnn(
    path: impl AsRef<Path>,
    device: &Device,
    input_size: u32,
) -> Result<FatigueCnn> {
    let vb = load_safetensors(&path, device)?;
    FatigueCnn::new(vb, input_size).with_context(|| {
        format!(
            "Model weights in {} do not fit a {input_size}x{input_size} input",
            path.as_ref().display()
        )
    })
}

fn check_parameter_groups(tensors: &HashMap<String, Tensor>) -> Result<()> {
    let missing: Vec<&str> = PARAMETER_GROUPS
        .iter()
        .copied()
        .filter(|group| !tensors.contains_key(&format!("{group}.weight")))
        .collect();

    if !missing.is_empty() {
        bail!("missing weights for {}", missing.join(", "));
    }
    Ok(())
}

fn to_candle_dtype(dtype: safetensors::Dtype) -> Result<DType> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        other => bail!("Unsupported weight dtype: {other:?}"),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use candle_nn::VarMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_raw_safetensors(names: &[&str]) -> NamedTempFile {
        use safetensors::serialize;
        use safetensors::tensor::TensorView;

        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let data_bytes: &[u8] = bytemuck::cast_slice(&data);

        let tensors: HashMap<String, TensorView<'_>> = names
            .iter()
            .map(|name| {
                let view = TensorView::new(safetensors::Dtype::F32, vec![2, 2], data_bytes)
                    .expect("valid tensor view");
                ((*name).to_string(), view)
            })
            .collect();
        let serialized = serialize(&tensors, &None).expect("serialize");

        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&serialized).expect("write");
        file
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = load_safetensors("/nonexistent/fatigue.safetensors", &Device::Cpu);
        assert!(result.is_err());
    }

    #[test]
    fn test_foreign_artifact_is_rejected() {
        let file = write_raw_safetensors(&["encoder.weight"]);
        let Err(err) = load_safetensors(file.path(), &Device::Cpu) else {
            panic!("foreign artifact was accepted");
        };
        assert!(format!("{err:#}").contains("missing weights for conv1"));
    }

    #[test]
    fn test_wrong_shapes_fail_to_build_network() {
        let names: Vec<String> = PARAMETER_GROUPS
            .iter()
            .flat_map(|g| [format!("{g}.weight"), format!("{g}.bias")])
            .collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let file = write_raw_safetensors(&refs);

        assert!(load_safetensors(file.path(), &Device::Cpu).is_ok());
        assert!(load_fatigue_cnn(file.path(), &Device::Cpu, 32).is_err());
    }

    #[test]
    fn test_round_trip_through_varmap() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        FatigueCnn::new(vb, 32).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.safetensors");
        varmap.save(&path).unwrap();

        let model = load_fatigue_cnn(&path, &device, 32).unwrap();
        assert_eq!(model.input_size(), 32);
        assert!(load_fatigue_cnn(&path, &device, 64).is_err());
    }
}
