pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum EstimateError {
        #[error("missing column: {0}")]
        MissingColumn(String),
        #[error("area table has no rows")]
        EmptyTable,
        #[error("row {row}, column {column}: {value:?} is not a number")]
        InvalidValue {
            row: usize,
            column: String,
            value: String,
        },
    }
}

pub mod units {
    use takeoff_core::document::Document;
    use tracing::info;

    /// `$INSUNITS` 代码到英尺的换算表（沿用既有报表口径）。
    pub const UNIT_SCALE_TO_FEET: [(i16, f64); 5] = [
        (1, 1.0),
        (2, 0.0833),
        (3, 0.00328),
        (4, 0.03937),
        (5, 1.09361),
    ];

    /// 未知或缺失的单位代码按英尺处理，返回 1.0。
    pub fn scale_to_feet(code: Option<i16>) -> f64 {
        code.and_then(|code| {
            UNIT_SCALE_TO_FEET
                .iter()
                .find(|(known, _)| *known == code)
                .map(|(_, factor)| *factor)
        })
        .unwrap_or(1.0)
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct UnitScale {
        pub code: Option<i16>,
        pub factor: f64,
    }

    impl UnitScale {
        pub fn resolve(document: &Document) -> Self {
            let code = document.units();
            let factor = scale_to_feet(code);
            info!(units = ?code, factor, "图纸单位换算系数");
            Self { code, factor }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn known_codes_map_to_literal_factors() {
            assert_eq!(scale_to_feet(Some(1)), 1.0);
            assert_eq!(scale_to_feet(Some(2)), 0.0833);
            assert_eq!(scale_to_feet(Some(3)), 0.00328);
            assert_eq!(scale_to_feet(Some(4)), 0.03937);
            assert_eq!(scale_to_feet(Some(5)), 1.09361);
        }

        #[test]
        fn unknown_or_missing_codes_fall_back_to_feet() {
            for code in [Some(0), Some(6), Some(-1), Some(i16::MAX), None] {
                assert_eq!(scale_to_feet(code), 1.0, "code {code:?}");
            }
        }

        #[test]
        fn resolve_reads_document_header() {
            let mut document = Document::new();
            document.set_units(Some(2));
            let scale = UnitScale::resolve(&document);
            assert_eq!(scale.code, Some(2));
            assert_eq!(scale.factor, 0.0833);
        }
    }
}

pub mod extract {
    use serde::{Serialize, Serializer};
    use takeoff_core::document::{Document, Entity};
    use takeoff_core::geometry::Point2;
    use tracing::{debug, warn};

    /// 面积换算沿用的圆周率近似值。
    pub const CIRCLE_PI: f64 = 3.1416;
    pub const HATCH_AREA: &str = "HATCH_AREA";

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum EntitySource {
        #[serde(rename = "TEXT")]
        Text,
        #[serde(rename = "MTEXT")]
        MText,
        #[serde(rename = "INSERT")]
        Insert,
        #[serde(rename = "DIMENSION")]
        Dimension,
        #[serde(rename = "HATCH")]
        Hatch,
        #[serde(rename = "LEADER")]
        Leader,
    }

    impl EntitySource {
        /// 标注文字类来源才代表房间名称，可参与面积匹配。
        fn names_a_room(self) -> bool {
            matches!(
                self,
                EntitySource::Text | EntitySource::MText | EntitySource::Insert
            )
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct RoomRecord {
        #[serde(rename = "Room")]
        pub room: String,
        #[serde(rename = "Layer")]
        pub layer: String,
        #[serde(rename = "X")]
        pub x: Option<f64>,
        #[serde(rename = "Y")]
        pub y: Option<f64>,
        #[serde(rename = "Source")]
        pub source: EntitySource,
    }

    impl RoomRecord {
        pub const HEADERS: [&'static str; 5] = ["Room", "Layer", "X", "Y", "Source"];

        fn new(
            room: impl Into<String>,
            layer: &str,
            anchor: Option<Point2>,
            source: EntitySource,
        ) -> Self {
            Self {
                room: room.into(),
                layer: layer.to_string(),
                x: anchor.map(Point2::x),
                y: anchor.map(Point2::y),
                source,
            }
        }

        pub fn anchor(&self) -> Option<Point2> {
            Some(Point2::new(self.x?, self.y?))
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub enum AreaEntity {
        #[serde(rename = "LWPOLYLINE")]
        Polyline,
        #[serde(rename = "CIRCLE")]
        Circle,
        #[serde(rename = "HATCH")]
        Hatch,
    }

    /// 面积值：平方英尺，或填充区域的未解析标记。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum AreaValue {
        SquareFeet(f64),
        Unresolved,
    }

    impl AreaValue {
        pub fn square_feet(self) -> Option<f64> {
            match self {
                AreaValue::SquareFeet(value) => Some(value),
                AreaValue::Unresolved => None,
            }
        }
    }

    impl Serialize for AreaValue {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                AreaValue::SquareFeet(value) => serializer.serialize_f64(*value),
                AreaValue::Unresolved => serializer.serialize_str(HATCH_AREA),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct AreaRecord {
        #[serde(rename = "Entity")]
        pub entity: AreaEntity,
        #[serde(rename = "Layer")]
        pub layer: String,
        #[serde(rename = "Area (sq ft)")]
        pub area: AreaValue,
    }

    impl AreaRecord {
        pub const HEADERS: [&'static str; 3] = ["Entity", "Layer", "Area (sq ft)"];
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    pub struct RoomAreaRecord {
        #[serde(rename = "Room")]
        pub room: String,
        #[serde(rename = "Area (sq ft)")]
        pub area: f64,
    }

    impl RoomAreaRecord {
        pub const HEADERS: [&'static str; 2] = ["Room", "Area (sq ft)"];
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct LayerMaterialRecord {
        #[serde(rename = "Layer")]
        pub layer: String,
        #[serde(rename = "Material Type")]
        pub material_type: String,
    }

    impl LayerMaterialRecord {
        pub const HEADERS: [&'static str; 2] = ["Layer", "Material Type"];
    }

    /// 房间标注提取：文字、多行文字、块属性、尺寸、填充与引线。
    pub fn extract_rooms(document: &Document) -> Vec<RoomRecord> {
        let mut rooms = Vec::new();
        for (_, entity) in document.entities() {
            match entity {
                Entity::Text(text) => rooms.push(RoomRecord::new(
                    text.content.trim(),
                    &text.layer,
                    Some(text.insert),
                    EntitySource::Text,
                )),
                Entity::MText(mtext) => rooms.push(RoomRecord::new(
                    mtext.content.trim(),
                    &mtext.layer,
                    Some(mtext.insert),
                    EntitySource::MText,
                )),
                // 每个属性单独成行，位置取块插入点
                Entity::BlockReference(reference) => {
                    rooms.extend(reference.attributes.iter().map(|attribute| {
                        debug!(block = %reference.name, tag = %attribute.tag, "读取块属性");
                        RoomRecord::new(
                            attribute.text.trim(),
                            &reference.layer,
                            Some(reference.insert),
                            EntitySource::Insert,
                        )
                    }));
                }
                Entity::Dimension(dimension) => rooms.push(RoomRecord::new(
                    dimension.text.trim(),
                    &dimension.layer,
                    Some(dimension.definition_point),
                    EntitySource::Dimension,
                )),
                Entity::Hatch(hatch) => rooms.push(RoomRecord::new(
                    format!("HATCH_{}", hatch.handle),
                    &hatch.layer,
                    None,
                    EntitySource::Hatch,
                )),
                Entity::Leader(leader) => rooms.push(RoomRecord::new(
                    format!("Leader_{}", leader.handle),
                    &leader.layer,
                    leader.vertices.first().copied(),
                    EntitySource::Leader,
                )),
                Entity::Polyline(_) | Entity::Circle(_) | Entity::Other(_) => {}
            }
        }
        rooms.retain(|record| !record.room.is_empty());

        if rooms.is_empty() {
            warn!("未检测到房间标注，请检查图层与标注设置");
        } else {
            debug!(count = rooms.len(), "房间标注提取完成");
        }
        rooms
    }

    /// 面积提取：闭合多段线、圆与填充；零面积与未解析行同样保留。
    pub fn extract_areas(document: &Document, scale: f64) -> Vec<AreaRecord> {
        let mut areas = Vec::new();
        for (_, entity) in document.entities() {
            let record = match entity {
                Entity::Polyline(polyline) => match polyline.area() {
                    Some(native) => AreaRecord {
                        entity: AreaEntity::Polyline,
                        layer: polyline.layer.clone(),
                        area: AreaValue::SquareFeet(native * scale * scale),
                    },
                    None => continue,
                },
                Entity::Circle(circle) => {
                    let radius = circle.radius * scale;
                    AreaRecord {
                        entity: AreaEntity::Circle,
                        layer: circle.layer.clone(),
                        area: AreaValue::SquareFeet(CIRCLE_PI * radius * radius),
                    }
                }
                Entity::Hatch(hatch) => {
                    debug!(
                        handle = %hatch.handle,
                        pattern = %hatch.pattern_name,
                        solid = hatch.is_solid,
                        "填充面积未解析"
                    );
                    AreaRecord {
                        entity: AreaEntity::Hatch,
                        layer: hatch.layer.clone(),
                        area: AreaValue::Unresolved,
                    }
                }
                Entity::Text(_)
                | Entity::MText(_)
                | Entity::BlockReference(_)
                | Entity::Dimension(_)
                | Entity::Leader(_)
                | Entity::Other(_) => continue,
            };
            debug!(entity = ?record.entity, area = ?record.area, "提取面积");
            areas.push(record);
        }
        if areas.is_empty() {
            warn!("未检测到可计算面积的实体");
        }
        areas
    }

    /// 图层表为空时退回到实体实际使用的图层。
    pub fn list_layers(document: &Document) -> Vec<String> {
        let declared: Vec<String> = document.layers().map(str::to_string).collect();
        if !declared.is_empty() {
            return declared;
        }
        let mut used: Vec<String> = Vec::new();
        for (_, entity) in document.entities() {
            let layer = entity.layer_name();
            if !used.iter().any(|known| known == layer) {
                used.push(layer.to_string());
            }
        }
        used
    }

    /// 按图层名关键字（不区分大小写）推断材料；填充实体统一记为填充图案。
    pub fn classify_layer_materials(document: &Document) -> Vec<LayerMaterialRecord> {
        document
            .entities()
            .filter_map(|(_, entity)| {
                let layer = entity.layer_name();
                let material = if matches!(entity, Entity::Hatch(_)) {
                    "Hatch Pattern"
                } else {
                    material_for_layer(layer)?
                };
                Some(LayerMaterialRecord {
                    layer: layer.to_string(),
                    material_type: material.to_string(),
                })
            })
            .collect()
    }

    fn material_for_layer(layer: &str) -> Option<&'static str> {
        let lowered = layer.to_ascii_lowercase();
        if lowered.contains("brick") {
            Some("Brick Wall")
        } else if lowered.contains("concrete") {
            Some("Concrete")
        } else if lowered.contains("tile") {
            Some("Tile Flooring")
        } else {
            None
        }
    }

    /// 将房间标注与包含其插入点的最小闭合多段线关联，得到房间面积。
    pub fn join_room_areas(
        document: &Document,
        rooms: &[RoomRecord],
        scale: f64,
    ) -> Vec<RoomAreaRecord> {
        let outlines: Vec<_> = document
            .entities()
            .filter_map(|(_, entity)| match entity {
                Entity::Polyline(polyline) => polyline.area().map(|area| (polyline, area)),
                _ => None,
            })
            .collect();

        let mut joined = Vec::new();
        for room in rooms.iter().filter(|room| room.source.names_a_room()) {
            let Some(anchor) = room.anchor() else {
                continue;
            };
            let smallest = outlines
                .iter()
                .filter(|(polyline, _)| polyline.contains(anchor))
                .map(|(_, area)| *area)
                .min_by(f64::total_cmp);
            match smallest {
                Some(native) => joined.push(RoomAreaRecord {
                    room: room.room.clone(),
                    area: native * scale * scale,
                }),
                None => debug!(room = %room.room, "房间标注不在任何闭合轮廓内"),
            }
        }
        joined
    }

}

pub mod tables {
    use takeoff_core::table::Table;

    /// 按制表符或连续两个以上空格切分单元格。
    pub fn split_cells(line: &str) -> Vec<String> {
        line.replace('\t', "  ")
            .split("  ")
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// 在一页文本中寻找列数一致的最长连续行块（至少两行、两列），首行作为表头。
    pub fn detect_table(page_text: &str) -> Option<Table> {
        let rows: Vec<Vec<String>> = page_text.lines().map(split_cells).collect();

        let mut best: Option<(usize, usize)> = None;
        let mut start = 0;
        while start < rows.len() {
            let width = rows[start].len();
            let mut end = start + 1;
            while end < rows.len() && rows[end].len() == width {
                end += 1;
            }
            let length = end - start;
            let longer = best.is_none_or(|(_, best_length)| length > best_length);
            if width >= 2 && length >= 2 && longer {
                best = Some((start, length));
            }
            start = end;
        }

        let (start, length) = best?;
        let mut block = rows[start..start + length].iter().cloned();
        let mut table = Table::new(block.next()?);
        for row in block {
            table.push_row(row);
        }
        Some(table)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn cells_split_on_wide_gaps_only() {
            assert_eq!(
                split_cells("Living Room    200\tTile"),
                vec!["Living Room", "200", "Tile"]
            );
            assert!(split_cells("   ").is_empty());
        }

        #[test]
        fn longest_aligned_block_becomes_the_table() {
            let page = "FLOOR PLAN SCHEDULE\n\
                        Room  Area\n\
                        Kitchen  120\n\
                        Bedroom  180\n\
                        Notes: all sizes  approx\n\
                        \n\
                        Sheet  A-101  Rev  2";
            let table = detect_table(page).expect("table detected");
            assert_eq!(table.headers(), ["Room", "Area"]);
            assert_eq!(table.len(), 3);
            assert_eq!(table.rows()[2], vec!["Notes: all sizes", "approx"]);
        }

        #[test]
        fn prose_pages_have_no_table() {
            assert!(detect_table("General notes\nAll dimensions in feet.").is_none());
            assert!(detect_table("Only  one  row").is_none());
            assert!(detect_table("").is_none());
        }
    }
}

pub mod estimate {
    use takeoff_core::materials::MaterialRates;
    use takeoff_core::table::{Table, format_float};
    use tracing::info;

    use crate::errors::EstimateError;
    use crate::extract::HATCH_AREA;

    pub const AREA_COLUMN: &str = "Area (sq ft)";
    pub const TOTAL_AREA_COLUMN: &str = "Total Area (sq ft)";
    pub const ROOM_COLUMN: &str = "Room";

    const ROOM_CANDIDATES: [&str; 2] = ["Room", "Room Name"];
    const AREA_CANDIDATES: [&str; 2] = ["Area (sq ft)", "Area"];

    /// 每 100 平方英尺按消耗率线性折算，不做舍入。
    #[inline]
    pub fn quantity(area: f64, rate: f64) -> f64 {
        (area / 100.0) * rate
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct MaterialEstimate {
        pub area: f64,
        pub quantities: Vec<(String, f64)>,
    }

    impl MaterialEstimate {
        /// 材料数量的文本形式，顺序与消耗率表一致。
        fn cells(&self) -> impl Iterator<Item = String> + '_ {
            self.quantities.iter().map(|(_, value)| format_float(*value))
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RoomArea {
        pub room: String,
        pub area: f64,
    }

    pub struct Estimator<'a> {
        rates: &'a MaterialRates,
    }

    impl<'a> Estimator<'a> {
        pub fn new(rates: &'a MaterialRates) -> Self {
            Self { rates }
        }

        pub fn estimate(&self, area: f64) -> MaterialEstimate {
            MaterialEstimate {
                area,
                quantities: self
                    .rates
                    .iter()
                    .map(|(name, rate)| (name.to_string(), quantity(area, rate)))
                    .collect(),
            }
        }

        /// `Total Area (sq ft)` + 各材料列，单行。
        pub fn total_table(&self, area: f64) -> Table {
            let mut table = Table::new(
                std::iter::once(TOTAL_AREA_COLUMN).chain(self.rates.names()),
            );
            let estimate = self.estimate(area);
            let row = std::iter::once(format_float(estimate.area))
                .chain(estimate.cells())
                .collect();
            table.push_row(row);
            table
        }

        /// `Room`, `Area (sq ft)` + 各材料列，每个房间一行。
        pub fn roomwise_table(&self, rooms: &[RoomArea]) -> Table {
            let mut table = Table::new(
                [ROOM_COLUMN, AREA_COLUMN]
                    .into_iter()
                    .chain(self.rates.names()),
            );
            for room in rooms {
                let estimate = self.estimate(room.area);
                let row = [room.room.clone(), format_float(estimate.area)]
                    .into_iter()
                    .chain(estimate.cells())
                    .collect();
                table.push_row(row);
            }
            table
        }

        /// `Total Area (sq ft)` + 各材料列 + `Room`，每个房间一行。
        pub fn room_material_table(&self, rooms: &[RoomArea]) -> Table {
            let mut table = Table::new(
                std::iter::once(TOTAL_AREA_COLUMN)
                    .chain(self.rates.names())
                    .chain(std::iter::once(ROOM_COLUMN)),
            );
            for room in rooms {
                let estimate = self.estimate(room.area);
                let row = std::iter::once(format_float(estimate.area))
                    .chain(estimate.cells())
                    .chain(std::iter::once(room.room.clone()))
                    .collect();
                table.push_row(row);
            }
            table
        }
    }

    /// 汇总面积列；跳过填充标记与空白单元格，其余非数值视为格式错误。
    pub fn total_area(table: &Table) -> Result<f64, EstimateError> {
        let column = table
            .column_index(AREA_COLUMN)
            .ok_or_else(|| EstimateError::MissingColumn(AREA_COLUMN.to_string()))?;
        if table.is_empty() {
            return Err(EstimateError::EmptyTable);
        }

        let mut total = 0.0;
        for (index, row) in table.rows().iter().enumerate() {
            let raw = row.get(column).map(|cell| cell.trim()).unwrap_or_default();
            if raw.is_empty() || raw == HATCH_AREA {
                continue;
            }
            total += parse_area(raw, index, AREA_COLUMN)?;
        }
        info!(total_area = total, rows = table.len(), "总面积汇总完成");
        Ok(total)
    }

    /// 读取 (房间, 面积) 表；每一行的面积都必须是数值。
    pub fn room_areas(table: &Table) -> Result<Vec<RoomArea>, EstimateError> {
        let room_column = table
            .find_column(&ROOM_CANDIDATES)
            .ok_or_else(|| EstimateError::MissingColumn(ROOM_CANDIDATES.join(" | ")))?;
        let area_column = table
            .find_column(&AREA_CANDIDATES)
            .ok_or_else(|| EstimateError::MissingColumn(AREA_CANDIDATES.join(" | ")))?;
        if table.is_empty() {
            return Err(EstimateError::EmptyTable);
        }

        let area_header = &table.headers()[area_column];
        table
            .rows()
            .iter()
            .enumerate()
            .map(|(index, row)| -> Result<RoomArea, EstimateError> {
                let raw = row.get(area_column).map(|cell| cell.trim()).unwrap_or_default();
                Ok(RoomArea {
                    room: row.get(room_column).cloned().unwrap_or_default(),
                    area: parse_area(raw, index, area_header)?,
                })
            })
            .collect()
    }

    fn parse_area(raw: &str, index: usize, column: &str) -> Result<f64, EstimateError> {
        raw.parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| EstimateError::InvalidValue {
                row: index + 1,
                column: column.to_string(),
                value: raw.to_string(),
            })
    }

}
