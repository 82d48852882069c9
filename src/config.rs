use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::RepairOptions;

/// Configuration for docxmend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Measurements used by the repair stages
    pub repair: RepairSettings,
    /// Options applied to every table unless analysis says otherwise
    pub defaults: DefaultOptions,
    /// Label list and summary styling for the field filler
    pub fields: FieldSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepairSettings {
    /// Table width as a percentage of the text column
    pub table_width_pct: u32,
    /// Border width in eighths of a point
    pub border_size: u32,
    pub border_color: String,

    /// Cell margins in dxa (twentieths of a point)
    pub cell_margin_vertical: u32,
    pub cell_margin_horizontal: u32,

    /// Paragraph spacing before and after, in dxa
    pub paragraph_spacing: u32,
    /// Hanging indent for bullet paragraphs, in dxa
    pub hanging_indent: u32,

    /// A gap of this many empty paragraphs or more blocks table merging
    pub max_gap_paragraphs: usize,
}

impl Default for RepairSettings {
    fn default() -> Self {
        RepairSettings {
            table_width_pct: 85,
            border_size: 4,
            border_color: "000000".to_string(),

            cell_margin_vertical: 40,
            cell_margin_horizontal: 108,

            paragraph_spacing: 40,
            hanging_indent: 284,

            max_gap_paragraphs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DefaultOptions {
    pub autofit: bool,
    pub fix_spacing: bool,
    pub fix_align: bool,
    /// Merge tables the analyzer reports as mergeable
    pub auto_merge: bool,
}

impl Default for DefaultOptions {
    fn default() -> Self {
        DefaultOptions {
            autofit: true,
            fix_spacing: true,
            fix_align: true,
            auto_merge: true,
        }
    }
}

impl DefaultOptions {
    /// Options for a table given what the analyzer found
    pub fn options_for(&self, border_issue: bool, can_merge_next: bool) -> RepairOptions {
        RepairOptions {
            fix_borders: border_issue,
            autofit: self.autofit,
            fix_spacing: self.fix_spacing,
            fix_align: self.fix_align,
            merge_next: self.auto_merge && can_merge_next,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldSettings {
    /// Labels in match order; more specific labels come first
    pub labels: Vec<String>,
    /// Label that receives the narrative summary of an extraction
    pub narrative_label: String,

    /// Phrase identifying the summary paragraph
    pub summary_marker: String,
    /// Text written before the per-level percentages
    pub summary_prefix: String,
    /// Word placed before each level number
    pub level_word: String,
    /// Colour of percentage values
    pub highlight_color: String,
}

impl Default for FieldSettings {
    fn default() -> Self {
        FieldSettings {
            labels: [
                "Họ và tên học sinh",
                "Ngày tháng năm sinh",
                "Ngày sinh",
                "Giới tính",
                "Lớp",
                "Trường",
                "Năm học",
                "Họ và tên giáo viên",
                "Họ và tên cha/mẹ",
                "Địa chỉ",
                "Số điện thoại",
                "Nhận xét chung",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            narrative_label: "Nhận xét chung".to_string(),

            summary_marker: "Tỷ lệ hoàn thành".to_string(),
            summary_prefix: "Tỷ lệ hoàn thành: ".to_string(),
            level_word: "Mức".to_string(),
            highlight_color: "C00000".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the config directory
    pub fn load() -> Result<Self> {
        if let Some(config_path) = Self::get_config_path() {
            if config_path.exists() {
                return Self::load_from(&config_path);
            }
        }

        // Return defaults if no config found
        Ok(Config::default())
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config directory
    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::get_config_path() {
            self.save_to(&config_path)?;
        }

        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("docxmend").join("config.toml"))
    }

    /// Initialize default config file
    pub fn init_default() -> Result<()> {
        let config = Config::default();
        config.save()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.repair.table_width_pct = 90;
        config.fields.labels.truncate(2);
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[repair]\nborder_size = 8\n").unwrap();
        assert_eq!(config.repair.border_size, 8);
        assert_eq!(config.repair.table_width_pct, 85);
        assert_eq!(config.fields, FieldSettings::default());
    }

    #[test]
    fn test_options_follow_analysis() {
        let defaults = DefaultOptions::default();
        let options = defaults.options_for(true, true);
        assert!(options.fix_borders && options.merge_next);

        let cautious = DefaultOptions {
            auto_merge: false,
            ..DefaultOptions::default()
        };
        assert!(!cautious.options_for(false, true).merge_next);
        assert!(!cautious.options_for(false, true).fix_borders);
    }
}
