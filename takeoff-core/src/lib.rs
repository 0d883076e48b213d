pub mod geometry {
    use glam::DVec2;
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示，坐标保持图纸原生单位。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn as_vec2(self) -> DVec2 {
            self.0
        }

        #[inline]
        pub fn distance(self, other: Point2) -> f64 {
            self.0.distance(other.0)
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self(value)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
        pub bulge: f64,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self {
                position,
                bulge: 0.0,
            }
        }

        #[inline]
        pub fn with_bulge(position: Point2, bulge: f64) -> Self {
            Self { position, bulge }
        }
    }

    /// 闭合环路面积：鞋带公式加上每段 bulge 圆弧对应的弓形面积，结果取绝对值。
    pub fn polygon_area(vertices: &[PolylineVertex]) -> f64 {
        if vertices.len() < 2 {
            return 0.0;
        }
        let mut twice_area = 0.0;
        let mut arc_area = 0.0;
        for (index, vertex) in vertices.iter().enumerate() {
            let next = &vertices[(index + 1) % vertices.len()];
            let a = vertex.position.as_vec2();
            let b = next.position.as_vec2();
            twice_area += a.perp_dot(b);
            arc_area += bulge_segment_area(vertex.position, next.position, vertex.bulge);
        }
        (twice_area * 0.5 + arc_area).abs()
    }

    /// 单段 bulge 圆弧与弦之间的弓形面积，符号与 bulge 一致。
    pub fn bulge_segment_area(start: Point2, end: Point2, bulge: f64) -> f64 {
        let chord = start.distance(end);
        if bulge.abs() < f64::EPSILON || chord < f64::EPSILON {
            return 0.0;
        }
        let sweep = 4.0 * bulge.atan();
        let radius = chord / (2.0 * (sweep / 2.0).sin());
        radius * radius * 0.5 * (sweep - sweep.sin())
    }

    /// 射线法判断点是否位于环路内部；bulge 按弦处理。
    pub fn polygon_contains(vertices: &[PolylineVertex], point: Point2) -> bool {
        if vertices.len() < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = vertices.len() - 1;
        for i in 0..vertices.len() {
            let pi = vertices[i].position;
            let pj = vertices[j].position;
            if (pi.y() > point.y()) != (pj.y() > point.y()) {
                let cross_x = (pj.x() - pi.x()) * (point.y() - pi.y()) / (pj.y() - pi.y()) + pi.x();
                if point.x() < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

}

pub mod document {
    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, PolylineVertex, polygon_area, polygon_contains};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    /// 图纸实体的封闭集合；提取流程对其做穷尽匹配。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub enum Entity {
        Text(Text),
        MText(MText),
        BlockReference(BlockReference),
        Dimension(Dimension),
        Hatch(Hatch),
        Leader(Leader),
        Polyline(Polyline),
        Circle(Circle),
        Other(OtherEntity),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Text(text) => &text.layer,
                Entity::MText(mtext) => &mtext.layer,
                Entity::BlockReference(reference) => &reference.layer,
                Entity::Dimension(dimension) => &dimension.layer,
                Entity::Hatch(hatch) => &hatch.layer,
                Entity::Leader(leader) => &leader.layer,
                Entity::Polyline(polyline) => &polyline.layer,
                Entity::Circle(circle) => &circle.layer,
                Entity::Other(other) => &other.layer,
            }
        }

        #[inline]
        pub fn handle(&self) -> &str {
            match self {
                Entity::Text(text) => &text.handle,
                Entity::MText(mtext) => &mtext.handle,
                Entity::BlockReference(reference) => &reference.handle,
                Entity::Dimension(dimension) => &dimension.handle,
                Entity::Hatch(hatch) => &hatch.handle,
                Entity::Leader(leader) => &leader.handle,
                Entity::Polyline(polyline) => &polyline.handle,
                Entity::Circle(circle) => &circle.handle,
                Entity::Other(other) => &other.handle,
            }
        }

        fn handle_mut(&mut self) -> &mut String {
            match self {
                Entity::Text(text) => &mut text.handle,
                Entity::MText(mtext) => &mut mtext.handle,
                Entity::BlockReference(reference) => &mut reference.handle,
                Entity::Dimension(dimension) => &mut dimension.handle,
                Entity::Hatch(hatch) => &mut hatch.handle,
                Entity::Leader(leader) => &mut leader.handle,
                Entity::Polyline(polyline) => &mut polyline.handle,
                Entity::Circle(circle) => &mut circle.handle,
                Entity::Other(other) => &mut other.handle,
            }
        }

        /// DXF 实体类型名（组码 0）。
        pub fn type_name(&self) -> &str {
            match self {
                Entity::Text(_) => "TEXT",
                Entity::MText(_) => "MTEXT",
                Entity::BlockReference(_) => "INSERT",
                Entity::Dimension(_) => "DIMENSION",
                Entity::Hatch(_) => "HATCH",
                Entity::Leader(_) => "LEADER",
                Entity::Polyline(_) => "LWPOLYLINE",
                Entity::Circle(_) => "CIRCLE",
                Entity::Other(other) => &other.kind,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Text {
        pub insert: Point2,
        pub content: String,
        pub handle: String,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MText {
        pub insert: Point2,
        /// 已去除格式控制码的纯文本。
        pub content: String,
        pub handle: String,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Attribute {
        pub tag: String,
        pub text: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct BlockReference {
        pub name: String,
        pub insert: Point2,
        pub attributes: Vec<Attribute>,
        pub handle: String,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Dimension {
        pub definition_point: Point2,
        pub text: String,
        pub handle: String,
        pub layer: String,
    }

    /// 填充区域。边界环路不做解析，面积始终视为未知。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Hatch {
        pub pattern_name: String,
        pub is_solid: bool,
        pub handle: String,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Leader {
        pub vertices: Vec<Point2>,
        pub handle: String,
        pub layer: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub is_closed: bool,
        pub handle: String,
        pub layer: String,
    }

    impl Polyline {
        /// 原生单位下的面积；开放多段线没有面积。
        pub fn area(&self) -> Option<f64> {
            self.is_closed.then(|| polygon_area(&self.vertices))
        }

        pub fn contains(&self, point: Point2) -> bool {
            self.is_closed && polygon_contains(&self.vertices, point)
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Circle {
        pub radius: f64,
        pub handle: String,
        pub layer: String,
    }

    /// 提取流程不解释的实体（LINE、ARC 等），只保留类型、图层与句柄。
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct OtherEntity {
        pub kind: String,
        pub handle: String,
        pub layer: String,
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        units: Option<i16>,
        layers: Vec<String>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            Self::default()
        }

        /// `$INSUNITS` 头变量；缺失时为 `None`。
        pub fn units(&self) -> Option<i16> {
            self.units
        }

        pub fn set_units(&mut self, units: Option<i16>) {
            self.units = units;
        }

        /// 图层表中声明的图层名，保持声明顺序且不重复。
        pub fn layers(&self) -> impl Iterator<Item = &str> {
            self.layers.iter().map(String::as_str)
        }

        pub fn add_layer(&mut self, name: impl Into<String>) {
            let name = name.into();
            if !self.layers.iter().any(|existing| existing == &name) {
                self.layers.push(name);
            }
        }

        pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
            self.entities.iter().map(|(id, entity)| (*id, entity))
        }

        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        /// 追加实体；句柄为空时以 `~<id>` 补齐，该形式不会与十六进制 DXF 句柄冲突。
        pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
            self.next_entity_id += 1;
            let id = EntityId(self.next_entity_id);
            let handle = entity.handle_mut();
            if handle.trim().is_empty() {
                *handle = format!("~{}", id.get());
            }
            self.entities.push((id, entity));
            id
        }

        pub fn add_text(
            &mut self,
            insert: Point2,
            content: impl Into<String>,
            layer: impl Into<String>,
        ) -> EntityId {
            self.add_entity(Entity::Text(Text {
                insert,
                content: content.into(),
                handle: String::new(),
                layer: layer.into(),
            }))
        }

        pub fn add_circle(&mut self, radius: f64, layer: impl Into<String>) -> EntityId {
            self.add_entity(Entity::Circle(Circle {
                radius,
                handle: String::new(),
                layer: layer.into(),
            }))
        }

        pub fn add_polyline<I>(&mut self, points: I, is_closed: bool, layer: impl Into<String>) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            self.add_entity(Entity::Polyline(Polyline {
                vertices: points.into_iter().map(PolylineVertex::new).collect(),
                is_closed,
                handle: String::new(),
                layer: layer.into(),
            }))
        }

        pub fn add_hatch(&mut self, handle: impl Into<String>, layer: impl Into<String>) -> EntityId {
            self.add_entity(Entity::Hatch(Hatch {
                pattern_name: "SOLID".to_string(),
                is_solid: true,
                handle: handle.into(),
                layer: layer.into(),
            }))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn document_assigns_unique_synthetic_handles() {
            let mut doc = Document::new();
            let text = doc.add_text(Point2::new(1.0, 1.0), "Kitchen", "ROOMS");
            let circle = doc.add_circle(2.0, "GEOM");
            let hatch = doc.add_hatch("2F", "FILL");

            let handles: Vec<(EntityId, String)> = doc
                .entities()
                .map(|(id, entity)| (id, entity.handle().to_string()))
                .collect();
            assert_eq!(handles[0], (text, format!("~{}", text.get())));
            assert_eq!(handles[1], (circle, format!("~{}", circle.get())));
            assert_eq!(handles[2], (hatch, "2F".to_string()));
        }

        #[test]
        fn layers_are_deduplicated_in_declaration_order() {
            let mut doc = Document::new();
            doc.add_layer("0");
            doc.add_layer("WALLS");
            doc.add_layer("0");
            let layers: Vec<&str> = doc.layers().collect();
            assert_eq!(layers, vec!["0", "WALLS"]);
        }

        #[test]
        fn open_polyline_has_no_area() {
            let mut doc = Document::new();
            doc.add_polyline(
                [Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(4.0, 4.0)],
                false,
                "0",
            );
            let (_, entity) = doc.entities().next().expect("polyline stored");
            let Entity::Polyline(polyline) = entity else {
                panic!("expected polyline");
            };
            assert!(polyline.area().is_none());
            assert!(!polyline.contains(Point2::new(3.0, 1.0)));
            assert_eq!(entity.type_name(), "LWPOLYLINE");
        }
    }
}

pub mod materials {
    use indexmap::IndexMap;
    use serde::{Deserialize, Serialize};

    /// 每 100 平方英尺的材料消耗率，顺序即报表列顺序。
    pub const STANDARD_MATERIAL_RATES: [(&str, f64); 10] = [
        ("Cement (bags)", 8.0),
        ("Paint (gallons)", 1.0 / 3.5),
        ("Tiles (boxes)", 1.0),
        ("Bricks (units)", 1200.0),
        ("Sand (cubic meters)", 0.6),
        ("Steel (kg)", 10.0),
        ("Concrete (cubic meters)", 0.5),
        ("Glass (sq ft)", 2.0),
        ("Wood (sq ft)", 5.0),
        ("Plaster (kg)", 10.0),
    ];

    /// 可注入的材料名 → 消耗率映射。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct MaterialRates(IndexMap<String, f64>);

    impl MaterialRates {
        pub fn standard() -> Self {
            Self::from_pairs(
                STANDARD_MATERIAL_RATES
                    .iter()
                    .map(|(name, rate)| (name.to_string(), *rate)),
            )
        }

        pub fn from_pairs<I, S>(pairs: I) -> Self
        where
            I: IntoIterator<Item = (S, f64)>,
            S: Into<String>,
        {
            Self(pairs.into_iter().map(|(name, rate)| (name.into(), rate)).collect())
        }

        pub fn get(&self, material: &str) -> Option<f64> {
            self.0.get(material).copied()
        }

        pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
            self.0.iter().map(|(name, rate)| (name.as_str(), *rate))
        }

        pub fn names(&self) -> impl Iterator<Item = &str> {
            self.0.keys().map(String::as_str)
        }

        pub fn len(&self) -> usize {
            self.0.len()
        }

        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }
    }

    impl Default for MaterialRates {
        fn default() -> Self {
            Self::standard()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn standard_table_keeps_column_order() {
            let rates = MaterialRates::standard();
            assert_eq!(rates.len(), 10);
            assert_eq!(rates.names().next(), Some("Cement (bags)"));
            assert_eq!(rates.names().last(), Some("Plaster (kg)"));
            assert_eq!(rates.get("Bricks (units)"), Some(1200.0));
            assert_eq!(rates.get("Paint (gallons)"), Some(1.0 / 3.5));
            assert!(rates.get("Gravel").is_none());
        }
    }
}

pub mod table {
    /// 以字符串单元格保存的表格，是各阶段 CSV 文件在内存中的形态。
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    }

    impl Table {
        pub fn new<I, S>(headers: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                headers: headers.into_iter().map(Into::into).collect(),
                rows: Vec::new(),
            }
        }

        pub fn push_row(&mut self, row: Vec<String>) {
            debug_assert_eq!(row.len(), self.headers.len(), "row width must match headers");
            self.rows.push(row);
        }

        pub fn headers(&self) -> &[String] {
            &self.headers
        }

        pub fn rows(&self) -> &[Vec<String>] {
            &self.rows
        }

        pub fn len(&self) -> usize {
            self.rows.len()
        }

        pub fn is_empty(&self) -> bool {
            self.rows.is_empty()
        }

        pub fn column_index(&self, name: &str) -> Option<usize> {
            self.headers.iter().position(|header| header.trim() == name)
        }

        /// 按候选顺序查找第一个存在的列。
        pub fn find_column(&self, candidates: &[&str]) -> Option<usize> {
            candidates.iter().find_map(|name| self.column_index(name))
        }

        pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
            self.rows
                .get(row)
                .and_then(|cells| cells.get(column))
                .map(String::as_str)
        }
    }

    /// 浮点数的统一文本形式：最短可往返表示，整数保留 `.0`。
    pub fn format_float(value: f64) -> String {
        format!("{value:?}")
    }

}
