//! Blender mesh converter
//!
//! Runs Blender headless with an inline script that clears the default
//! scene, imports the glTF binary and exports it in the target format next
//! to the input file.

use crate::config::ConversionConfig;
use crate::provider::MeshConverter;
use smith_core::{Result, SmithError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Converts meshes by running a Blender subprocess
#[derive(Debug, Clone)]
pub struct BlenderConverter {
    executable: PathBuf,
}

impl BlenderConverter {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(&config.blender_path)
    }
}

impl MeshConverter for BlenderConverter {
    fn convert(&self, input: &Path, format: &str) -> Result<PathBuf> {
        let output = input.with_extension(format);
        let script = conversion_script(input, &output, format)?;

        tracing::debug!(input = %input.display(), format, "running blender");
        let result = Command::new(&self.executable)
            .arg("--background")
            .arg("--python-expr")
            .arg(&script)
            .output()
            .map_err(|e| {
                SmithError::ConversionFailure(format!(
                    "could not start {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(SmithError::ConversionFailure(format!(
                "blender exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        if !output.exists() {
            return Err(SmithError::ConversionFailure(format!(
                "blender reported success but {} was not written",
                output.display()
            )));
        }

        Ok(output)
    }
}

/// Python run inside Blender for one conversion
fn conversion_script(input: &Path, output: &Path, format: &str) -> Result<String> {
    let export = match format {
        "fbx" => format!(
            "bpy.ops.export_scene.fbx(filepath={}, embed_textures=True, path_mode='COPY')",
            py_str(output)
        ),
        "obj" => format!("bpy.ops.wm.obj_export(filepath={})", py_str(output)),
        "gltf" => format!(
            "bpy.ops.export_scene.gltf(filepath={}, export_format='GLTF_SEPARATE')",
            py_str(output)
        ),
        other => {
            return Err(SmithError::ConversionFailure(format!(
                "unsupported target format '{}'",
                other
            )))
        }
    };

    Ok(format!(
        "import bpy\n\
         if bpy.context.active_object and bpy.context.active_object.mode != 'OBJECT':\n    \
         bpy.ops.object.mode_set(mode='OBJECT')\n\
         bpy.ops.object.select_all(action='SELECT')\n\
         if bpy.context.selected_objects:\n    \
         bpy.ops.object.delete()\n\
         bpy.ops.import_scene.gltf(filepath={})\n\
         {}\n",
        py_str(input),
        export
    ))
}

/// Quote a path as a Python string literal
fn py_str(path: &Path) -> String {
    let escaped = path
        .to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "\\'");
    format!("'{}'", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fbx_script_imports_and_exports() {
        let script = conversion_script(
            Path::new("/wiki/characters/dustmother/assets/models/dustmother.glb"),
            Path::new("/wiki/characters/dustmother/assets/models/dustmother.fbx"),
            "fbx",
        )
        .unwrap();

        assert!(script.contains(
            "bpy.ops.import_scene.gltf(filepath='/wiki/characters/dustmother/assets/models/dustmother.glb')"
        ));
        assert!(script.contains("export_scene.fbx(filepath='/wiki/characters/dustmother/assets/models/dustmother.fbx'"));
        assert!(script.contains("embed_textures=True"));
        assert!(script.contains("\nbpy.ops.object.select_all(action='SELECT')\n"));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = conversion_script(Path::new("a.glb"), Path::new("a.usd"), "usd");
        assert!(matches!(result, Err(SmithError::ConversionFailure(_))));
    }

    #[test]
    fn test_paths_are_escaped() {
        assert_eq!(py_str(Path::new("it's.glb")), "'it\\'s.glb'");
    }

    #[test]
    fn test_missing_executable_is_conversion_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("prop.glb");
        std::fs::write(&input, b"glTF").unwrap();

        let converter = BlenderConverter::new(dir.path().join("no-such-blender"));
        let result = converter.convert(&input, "fbx");
        assert!(matches!(result, Err(SmithError::ConversionFailure(_))));
    }
}
