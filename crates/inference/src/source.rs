//! 模型来源解析
//!
//! 模型标识支持两种写法：
//!
//! - 本地路径：`.gguf` 文件，或包含 `.gguf` 文件的目录，旁边需要有 `tokenizer.json`
//! - Hugging Face 仓库：`owner/repo[:file.gguf][@owner/tokenizer-repo]`

use crate::{InferenceError, Result};
use hf_hub::api::sync::{Api, ApiBuilder, ApiRepo};
use std::path::{Path, PathBuf};

/// 分词器文件名
const TOKENIZER_FILE: &str = "tokenizer.json";

/// 分词器配置文件名（包含聊天模板）
const TOKENIZER_CONFIG_FILE: &str = "tokenizer_config.json";

/// 未指定权重文件时优先选择的量化规格
const PREFERRED_QUANTIZATION: &str = "q4_k_m";

/// 模型来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// 本地文件或目录
    Local(PathBuf),
    /// Hugging Face 仓库
    Hub {
        repo: String,
        file: Option<String>,
        tokenizer_repo: Option<String>,
    },
}

/// 加载模型需要的本地文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub weights: PathBuf,
    pub tokenizer: PathBuf,
    pub tokenizer_config: Option<PathBuf>,
}

impl ModelSource {
    /// 解析模型标识
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(InferenceError::InvalidIdentifier("标识为空".to_string()));
        }

        let path = Path::new(identifier);
        if path.exists() {
            return Ok(Self::Local(path.to_path_buf()));
        }

        let (rest, tokenizer_repo) = match identifier.split_once('@') {
            Some((rest, tokenizer_repo)) => (rest, Some(tokenizer_repo.to_string())),
            None => (identifier, None),
        };
        let (repo, file) = match rest.split_once(':') {
            Some((repo, file)) => (repo, Some(file.to_string())),
            None => (rest, None),
        };

        validate_repo_id(repo, identifier)?;
        if let Some(ref tokenizer_repo) = tokenizer_repo {
            validate_repo_id(tokenizer_repo, identifier)?;
        }
        if let Some(ref file) = file {
            if !file.ends_with(".gguf") {
                return Err(InferenceError::InvalidIdentifier(format!(
                    "{}（权重文件必须是 .gguf）",
                    identifier
                )));
            }
        }

        Ok(Self::Hub {
            repo: repo.to_string(),
            file,
            tokenizer_repo,
        })
    }

    /// 定位（必要时下载）模型文件
    pub fn resolve(&self) -> Result<ModelFiles> {
        match self {
            Self::Local(path) => resolve_local(path),
            Self::Hub {
                repo,
                file,
                tokenizer_repo,
            } => resolve_hub(repo, file.as_deref(), tokenizer_repo.as_deref()),
        }
    }
}

fn validate_repo_id(repo: &str, identifier: &str) -> Result<()> {
    let mut parts = repo.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    ) && !repo.chars().any(char::is_whitespace);

    if valid {
        Ok(())
    } else {
        Err(InferenceError::InvalidIdentifier(identifier.to_string()))
    }
}

fn resolve_local(path: &Path) -> Result<ModelFiles> {
    let (dir, weights) = if path.is_dir() {
        let weights = find_gguf(path)?;
        (path.to_path_buf(), weights)
    } else {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (dir, path.to_path_buf())
    };

    let tokenizer = dir.join(TOKENIZER_FILE);
    if !tokenizer.is_file() {
        return Err(InferenceError::NotFound(tokenizer.display().to_string()));
    }

    let tokenizer_config = Some(dir.join(TOKENIZER_CONFIG_FILE)).filter(|p| p.is_file());

    Ok(ModelFiles {
        weights,
        tokenizer,
        tokenizer_config,
    })
}

fn find_gguf(dir: &Path) -> Result<PathBuf> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "gguf") {
            candidates.push(path);
        }
    }
    candidates.sort();

    let names: Vec<String> = candidates
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    let chosen = pick_weights_file(&names)
        .ok_or_else(|| InferenceError::NotFound(format!("{} 下的 .gguf 文件", dir.display())))?;

    Ok(dir.join(chosen))
}

/// 选择权重文件：优先 q4_k_m，否则取第一个 .gguf
pub(crate) fn pick_weights_file(names: &[String]) -> Option<&str> {
    let gguf = || names.iter().filter(|n| n.ends_with(".gguf"));
    gguf()
        .find(|n| n.to_lowercase().contains(PREFERRED_QUANTIZATION))
        .or_else(|| gguf().next())
        .map(String::as_str)
}

/// 关闭下载进度条：终端由界面占用，进度写到 stderr 会覆盖窗口
fn quiet_hub(builder: ApiBuilder) -> ApiBuilder {
    builder.with_progress(false)
}

fn resolve_hub(repo: &str, file: Option<&str>, tokenizer_repo: Option<&str>) -> Result<ModelFiles> {
    let api: Api = quiet_hub(ApiBuilder::new()).build()?;
    let weights_repo = api.model(repo.to_string());

    let file = match file {
        Some(file) => file.to_string(),
        None => {
            let info = weights_repo.info()?;
            let names: Vec<String> = info.siblings.into_iter().map(|s| s.rfilename).collect();
            pick_weights_file(&names)
                .map(str::to_string)
                .ok_or_else(|| InferenceError::NotFound(format!("{} 中的 .gguf 文件", repo)))?
        }
    };

    tracing::info!("获取模型权重: {}/{}", repo, file);
    let weights = weights_repo.get(&file)?;

    let tokenizer_repo = match tokenizer_repo {
        Some(tokenizer_repo) => api.model(tokenizer_repo.to_string()),
        None => weights_repo,
    };
    let tokenizer = tokenizer_repo.get(TOKENIZER_FILE)?;
    let tokenizer_config = optional_file(&tokenizer_repo, TOKENIZER_CONFIG_FILE);

    Ok(ModelFiles {
        weights,
        tokenizer,
        tokenizer_config,
    })
}

fn optional_file(repo: &ApiRepo, name: &str) -> Option<PathBuf> {
    match repo.get(name) {
        Ok(path) => Some(path),
        Err(err) => {
            tracing::debug!("可选文件 {} 不可用: {}", name, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_client_has_no_progress_bar() {
        let dir = tempfile::tempdir().unwrap();
        let cache = hf_hub::Cache::new(dir.path().to_path_buf());
        let api = quiet_hub(ApiBuilder::from_cache(cache)).build().unwrap();
        assert!(format!("{:?}", api).contains("progress: false"));
    }

    #[test]
    fn test_parse_hub_identifiers() {
        assert_eq!(
            ModelSource::parse("Qwen/Qwen2.5-0.5B-Instruct-GGUF").unwrap(),
            ModelSource::Hub {
                repo: "Qwen/Qwen2.5-0.5B-Instruct-GGUF".to_string(),
                file: None,
                tokenizer_repo: None,
            }
        );

        assert_eq!(
            ModelSource::parse("  a/b:model-q8_0.gguf@c/d ").unwrap(),
            ModelSource::Hub {
                repo: "a/b".to_string(),
                file: Some("model-q8_0.gguf".to_string()),
                tokenizer_repo: Some("c/d".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_rejects_invalid_identifiers() {
        for identifier in ["", "   ", "no-slash", "a/b/c", "/b", "a/", "a/b:weights.bin", "a/b@x", "a b/c"] {
            assert!(
                matches!(
                    ModelSource::parse(identifier),
                    Err(InferenceError::InvalidIdentifier(_))
                ),
                "应拒绝: {:?}",
                identifier
            );
        }
    }

    #[test]
    fn test_pick_weights_prefers_q4_k_m() {
        let names = vec![
            "README.md".to_string(),
            "model-Q8_0.gguf".to_string(),
            "model-Q4_K_M.gguf".to_string(),
        ];
        assert_eq!(pick_weights_file(&names), Some("model-Q4_K_M.gguf"));

        let names = vec!["config.json".to_string(), "model-f16.gguf".to_string()];
        assert_eq!(pick_weights_file(&names), Some("model-f16.gguf"));

        assert_eq!(pick_weights_file(&["tokenizer.json".to_string()]), None);
    }

    #[test]
    fn test_resolve_local_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tiny.gguf"), b"").unwrap();
        std::fs::write(dir.path().join(TOKENIZER_FILE), b"{}").unwrap();

        let source = ModelSource::parse(dir.path().to_str().unwrap()).unwrap();
        assert!(matches!(source, ModelSource::Local(_)));

        let files = source.resolve().unwrap();
        assert_eq!(files.weights, dir.path().join("tiny.gguf"));
        assert_eq!(files.tokenizer, dir.path().join(TOKENIZER_FILE));
        assert_eq!(files.tokenizer_config, None);
    }

    #[test]
    fn test_resolve_local_file_requires_tokenizer() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("tiny.gguf");
        std::fs::write(&weights, b"").unwrap();

        let source = ModelSource::parse(weights.to_str().unwrap()).unwrap();
        assert!(matches!(source.resolve(), Err(InferenceError::NotFound(_))));

        std::fs::write(dir.path().join(TOKENIZER_FILE), b"{}").unwrap();
        std::fs::write(dir.path().join(TOKENIZER_CONFIG_FILE), b"{}").unwrap();
        let files = source.resolve().unwrap();
        assert_eq!(files.weights, weights);
        assert_eq!(
            files.tokenizer_config,
            Some(dir.path().join(TOKENIZER_CONFIG_FILE))
        );
    }

    #[test]
    fn test_resolve_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = ModelSource::Local(dir.path().to_path_buf());
        assert!(matches!(source.resolve(), Err(InferenceError::NotFound(_))));
    }
}
