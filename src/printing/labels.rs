use async_trait::async_trait;
use chrono::Local;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use super::{Label, LabelRenderer};
use crate::errors::ServiceError;
use crate::models::partner_info::{bool_zh, cargo_value_zh, delivery_method_zh};
use crate::models::Shipment;

const PAGE_BREAK: char = '\u{000C}';

const ATTENTION: [&str; 4] = [
    "ВНИМАНИЕ! При получении груза",
    "обязательно проверьте целостность",
    "внешней упаковки и характеристики",
    "груза!!!",
];

/// Renders labels as plain-text files under a label directory.
#[derive(Debug, Clone)]
pub struct TextLabelRenderer {
    dir: PathBuf,
}

impl TextLabelRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, suffix: &str, content: String) -> Result<Label, ServiceError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ServiceError::InternalError(format!("label dir {}: {}", self.dir.display(), e))
        })?;
        let path = self.dir.join(format!("{}-{}.txt", Uuid::new_v4(), suffix));
        tokio::fs::write(&path, content).await.map_err(|e| {
            ServiceError::InternalError(format!("label file {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "label rendered");
        Ok(Label { path })
    }
}

pub fn preparation_text(shipment: &Shipment) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "票号: {}", shipment.code);
    let _ = writeln!(out, "客户号: {}", shipment.customer_code);
    let _ = writeln!(out, "入库数量: {}", shipment.entries.len());
    let _ = writeln!(out, "包装方式: {}", shipment.package_method_zh);

    let _ = writeln!(out, "\n备注");
    for (i, note) in shipment.notes.iter().enumerate() {
        let _ = writeln!(out, "{}: {}", i + 1, note.content);
    }

    let _ = writeln!(out);
    for (i, entry) in shipment.entries.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} ({}) {} {}",
            i + 1,
            entry.id,
            entry.box_qty,
            entry.source,
            entry.track_code
        );
    }
    out
}

pub fn partner_info_text(shipment: &Shipment) -> String {
    let partner = &shipment.partner_info;
    let mut out = String::new();
    let _ = writeln!(out, "票号 {} 出货信息\n", shipment.code);
    let _ = writeln!(out, "出货日期: {}", Local::now().format("%Y.%m.%d"));
    let _ = writeln!(out, "合作方: {}", partner.code);
    let _ = writeln!(out, "运输方式: {}", delivery_method_zh(partner.delivery_method));
    let _ = writeln!(out, "保险: {}", cargo_value_zh(partner.cargo_value));
    let _ = writeln!(out, "是否报关: {}", bool_zh(shipment.need_declare));

    let _ = writeln!(out, "\n总重量: {} kg", shipment.weight());
    let _ = writeln!(out, "总体积: {} m3", shipment.cubage());
    let _ = writeln!(out, "密度: {} kg/m3", shipment.density());
    let _ = writeln!(out, "箱数: {} 箱", shipment.unit_loads.len());

    let _ = writeln!(out, "\n收货人：{}", partner.recipient.name);
    let _ = writeln!(out, "电话：{}", partner.recipient.phone_number);
    let _ = writeln!(out, "目的地：{}", partner.recipient.destination);
    let _ = writeln!(out, "\n品名: {}\n", partner.product_name);

    for (i, ul) in shipment.unit_loads.iter().enumerate() {
        let _ = writeln!(out, "{}. {} kg", i + 1, ul.weight);
        let _ = writeln!(out, "{} × {} × {}", ul.length, ul.width, ul.height);
        let _ = writeln!(out, "{} m3", ul.cubage());
    }
    out
}

pub fn unit_load_pages(shipment: &Shipment) -> Vec<String> {
    let count = shipment.unit_loads.len();
    shipment
        .unit_loads
        .iter()
        .map(|ul| {
            let mut page = String::new();
            let _ = writeln!(page, "{}", shipment.code);
            let _ = writeln!(page, "{}/{}", ul.sequence, count);
            let _ = writeln!(page, "{} kg", ul.weight);
            let _ = writeln!(page, "{} m3", ul.cubage());
            let _ = writeln!(page, "{} cm × {} cm × {} cm", ul.length, ul.width, ul.height);
            let _ = writeln!(page, "\nГабариты всего груза/货物整体规格:");
            let _ = writeln!(page, "ВЕС/重量: {} kg", shipment.weight());
            let _ = writeln!(page, "ОБЪЕМ/体积: {} m3\n", shipment.cubage());
            for line in ATTENTION {
                let _ = writeln!(page, "{}", line);
            }
            let _ = writeln!(
                page,
                "\n[{}-{}/{}]",
                shipment.code.to_lowercase(),
                ul.sequence,
                count
            );
            page
        })
        .collect()
}

#[async_trait]
impl LabelRenderer for TextLabelRenderer {
    async fn preparation_label(&self, shipment: &Shipment) -> Result<Label, ServiceError> {
        self.write("preparation", preparation_text(shipment)).await
    }

    async fn partner_info_label(&self, shipment: &Shipment) -> Result<Label, ServiceError> {
        self.write("partner-info", partner_info_text(shipment)).await
    }

    async fn unit_load_labels(&self, shipment: &Shipment) -> Result<Label, ServiceError> {
        if shipment.unit_loads.is_empty() {
            return Err(ServiceError::ValidationError(format!(
                "shipment {} has no unit loads",
                shipment.code
            ))
            .into_api("Shipment has no unit loads", "Add unit loads to the shipment first"));
        }
        let pages = unit_load_pages(shipment).join(&PAGE_BREAK.to_string());
        self.write("unit-loads", pages).await
    }

    /// Lower-case payload for the scanners, upper-case caption for people.
    async fn entry_barcode(&self, entry_id: &str) -> Result<Label, ServiceError> {
        let content = format!(
            "[{}]\n{}\n",
            entry_id.to_lowercase(),
            entry_id.to_uppercase()
        );
        self.write("entry-barcode", content).await
    }
}
