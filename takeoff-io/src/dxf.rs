use takeoff_core::document::{
    Attribute, BlockReference, Circle, Dimension, Document, Entity, Hatch, Leader, MText,
    OtherEntity, Polyline, Text,
};
use takeoff_core::geometry::{Point2, PolylineVertex};

#[derive(Debug)]
pub(crate) enum DxfError {
    Invalid { message: String },
}

impl DxfError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

pub(crate) fn parse_document(source: &str) -> Result<Document, DxfError> {
    DxfParser::new(source).parse()
}

/// 所有实体共有的句柄（组码 5）与图层（组码 8）。
#[derive(Default)]
struct CommonFields {
    handle: Option<String>,
    layer: Option<String>,
}

impl CommonFields {
    fn accept(&mut self, code: i32, value: &str) -> bool {
        let slot = match code {
            5 => &mut self.handle,
            8 => &mut self.layer,
            _ => return false,
        };
        let trimmed = value.trim();
        if slot.is_none() && !trimmed.is_empty() {
            *slot = Some(trimmed.to_string());
        }
        true
    }

    fn handle(&self) -> String {
        self.handle.clone().unwrap_or_default()
    }

    fn layer(&self) -> String {
        self.layer.clone().unwrap_or_else(|| "0".to_string())
    }
}

struct DxfParser<'a> {
    reader: DxfReader<'a>,
}

impl<'a> DxfParser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            reader: DxfReader::new(source),
        }
    }

    fn parse(mut self) -> Result<Document, DxfError> {
        let mut document = Document::new();
        while let Some((code, value)) = self.reader.next_pair()? {
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "意外的组码 {code}（期望 0 表示 SECTION/EOF）"
                )));
            }
            match value.trim() {
                "SECTION" => {
                    let (name_code, name) = self
                        .reader
                        .next_pair()?
                        .ok_or_else(|| DxfError::invalid("SECTION 缺少名称（组码 2）"))?;
                    if name_code != 2 {
                        return Err(DxfError::invalid(format!(
                            "SECTION 名称使用了组码 {name_code}（期望 2）"
                        )));
                    }
                    match name.trim() {
                        "HEADER" => self.parse_header(&mut document)?,
                        "TABLES" => self.parse_tables(&mut document)?,
                        "ENTITIES" => self.parse_entities(&mut document)?,
                        _ => self.skip_section()?,
                    }
                }
                "EOF" => break,
                unexpected => {
                    return Err(DxfError::invalid(format!(
                        "意外的标记 {unexpected}，期望 SECTION 或 EOF"
                    )));
                }
            }
        }
        Ok(document)
    }

    fn skip_section(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some(_) => continue,
                None => {
                    return Err(DxfError::invalid("SECTION 未找到 ENDSEC 终止标记"));
                }
            }
        }
        Ok(())
    }

    fn parse_header(&mut self, document: &mut Document) -> Result<(), DxfError> {
        let mut variable: Option<String> = None;
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) if value.trim() == "ENDSEC" => break,
                Some((9, name)) => variable = Some(name.trim().to_string()),
                Some((70, value)) if variable.as_deref() == Some("$INSUNITS") => {
                    document.set_units(Some(parse_i16(&value, "$INSUNITS")?));
                }
                Some(_) => continue,
                None => return Err(DxfError::invalid("HEADER 段提前结束")),
            }
        }
        Ok(())
    }

    fn parse_tables(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("TABLES 段提前结束")),
            };
            if code != 0 {
                continue;
            }
            match value.trim() {
                "ENDSEC" => break,
                "LAYER" => {
                    while let Some((code, value)) = self.next_field("LAYER")? {
                        if code == 2 && !value.trim().is_empty() {
                            document.add_layer(value.trim());
                        }
                    }
                }
                _ => self.skip_entity_body()?,
            }
        }
        Ok(())
    }

    fn parse_entities(&mut self, document: &mut Document) -> Result<(), DxfError> {
        loop {
            let (code, value) = match self.reader.next_pair()? {
                Some(pair) => pair,
                None => return Err(DxfError::invalid("ENTITIES 段提前结束")),
            };
            if code != 0 {
                return Err(DxfError::invalid(format!(
                    "ENTITIES 段遇到组码 {code}（期望 0 表示实体起始）"
                )));
            }

            match value.trim() {
                "ENDSEC" => break,
                // 旧式 POLYLINE 的子记录，不单独计为实体
                "VERTEX" | "SEQEND" => self.skip_entity_body()?,
                kind => {
                    let entity = self.parse_entity(kind)?;
                    document.add_entity(entity);
                }
            }
        }
        Ok(())
    }

    fn parse_entity(&mut self, kind: &str) -> Result<Entity, DxfError> {
        match kind {
            "TEXT" => self.parse_text(),
            "MTEXT" => self.parse_mtext(),
            "INSERT" => self.parse_insert(),
            "DIMENSION" => self.parse_dimension(),
            "HATCH" => self.parse_hatch(),
            "LEADER" => self.parse_leader(),
            "LWPOLYLINE" => self.parse_lwpolyline(),
            "CIRCLE" => self.parse_circle(),
            other => self.parse_other(other),
        }
    }

    /// 读取当前实体的下一个组码；遇到组码 0 时回退并返回 `None`。
    fn next_field(&mut self, kind: &str) -> Result<Option<(i32, String)>, DxfError> {
        match self.reader.next_pair()? {
            Some((0, value)) => {
                self.reader.put_back((0, value));
                Ok(None)
            }
            Some(pair) => Ok(Some(pair)),
            None => Err(DxfError::invalid(format!("{kind} 未正确结束"))),
        }
    }

    fn parse_text(&mut self) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        let mut insert_x = None;
        let mut insert_y = None;
        let mut content: Option<String> = None;
        while let Some((code, value)) = self.next_field("TEXT")? {
            if common.accept(code, &value) {
                continue;
            }
            match code {
                10 => assign_coord(&mut insert_x, &value, "TEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "TEXT 插入点 Y（组码 20）")?,
                1 => content = Some(decode_inline_text(&value)),
                _ => {}
            }
        }

        let ix = insert_x.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("TEXT 缺少插入点 Y（组码 20）"))?;
        Ok(Entity::Text(Text {
            insert: Point2::new(ix, iy),
            content: content.unwrap_or_default(),
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    fn parse_mtext(&mut self) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        let mut insert_x = None;
        let mut insert_y = None;
        let mut fragments: Vec<String> = Vec::new();
        while let Some((code, value)) = self.next_field("MTEXT")? {
            if common.accept(code, &value) {
                continue;
            }
            match code {
                10 => assign_coord(&mut insert_x, &value, "MTEXT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "MTEXT 插入点 Y（组码 20）")?,
                // 组码 3 为前置分块，组码 1 为最后一块
                1 | 3 => fragments.push(value),
                _ => {}
            }
        }

        let ix = insert_x.ok_or_else(|| DxfError::invalid("MTEXT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("MTEXT 缺少插入点 Y（组码 20）"))?;
        Ok(Entity::MText(MText {
            insert: Point2::new(ix, iy),
            content: decode_mtext_content(&fragments.concat()),
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    fn parse_insert(&mut self) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        let mut name = None;
        let mut insert_x = None;
        let mut insert_y = None;
        while let Some((code, value)) = self.next_field("INSERT")? {
            if common.accept(code, &value) {
                continue;
            }
            match code {
                2 => {
                    if name.is_some() {
                        return Err(DxfError::invalid("INSERT 遇到重复的块名（组码 2）"));
                    }
                    name = Some(value.trim().to_string());
                }
                10 => assign_coord(&mut insert_x, &value, "INSERT 插入点 X（组码 10）")?,
                20 => assign_coord(&mut insert_y, &value, "INSERT 插入点 Y（组码 20）")?,
                _ => {}
            }
        }

        let name = name.ok_or_else(|| DxfError::invalid("INSERT 缺少块名（组码 2）"))?;
        let ix = insert_x.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 X（组码 10）"))?;
        let iy = insert_y.ok_or_else(|| DxfError::invalid("INSERT 缺少插入点 Y（组码 20）"))?;

        let mut attributes: Vec<Attribute> = Vec::new();
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => match value.trim() {
                    "ATTRIB" => attributes.push(self.parse_attrib()?),
                    "SEQEND" => {
                        self.skip_entity_body()?;
                        break;
                    }
                    _ => {
                        self.reader.put_back((0, value));
                        break;
                    }
                },
                Some((code, value)) => {
                    return Err(DxfError::invalid(format!(
                        "INSERT 属性段出现意外组码 {code} 值 {value}"
                    )));
                }
                None => break,
            }
        }

        Ok(Entity::BlockReference(BlockReference {
            name,
            insert: Point2::new(ix, iy),
            attributes,
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    fn parse_attrib(&mut self) -> Result<Attribute, DxfError> {
        let mut tag = None;
        let mut text = None;
        while let Some((code, value)) = self.next_field("ATTRIB")? {
            match code {
                1 => text = Some(decode_inline_text(&value)),
                2 => tag = Some(value.trim().to_string()),
                _ => {}
            }
        }

        Ok(Attribute {
            tag: tag.ok_or_else(|| DxfError::invalid("ATTRIB 缺少标记（组码 2）"))?,
            text: text.unwrap_or_default(),
        })
    }

    fn parse_dimension(&mut self) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        let mut definition_x = None;
        let mut definition_y = None;
        let mut text = String::new();
        while let Some((code, value)) = self.next_field("DIMENSION")? {
            if common.accept(code, &value) {
                continue;
            }
            match code {
                10 => assign_coord(&mut definition_x, &value, "DIMENSION 定义点 X（组码 10）")?,
                20 => assign_coord(&mut definition_y, &value, "DIMENSION 定义点 Y（组码 20）")?,
                1 => text = decode_mtext_content(&value),
                _ => {}
            }
        }

        let dx = definition_x
            .ok_or_else(|| DxfError::invalid("DIMENSION 缺少定义点 X（组码 10）"))?;
        let dy = definition_y
            .ok_or_else(|| DxfError::invalid("DIMENSION 缺少定义点 Y（组码 20）"))?;
        Ok(Entity::Dimension(Dimension {
            definition_point: Point2::new(dx, dy),
            text,
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    /// 只读取填充的标识信息；边界环路数据整体跳过。
    fn parse_hatch(&mut self) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        let mut pattern_name: Option<String> = None;
        let mut solid_flag: Option<i16> = None;
        while let Some((code, value)) = self.next_field("HATCH")? {
            if common.accept(code, &value) {
                continue;
            }
            match code {
                2 if pattern_name.is_none() => pattern_name = Some(value.trim().to_string()),
                70 if solid_flag.is_none() => {
                    solid_flag = Some(parse_i16(&value, "HATCH 实体填充标志（组码 70）")?)
                }
                _ => {}
            }
        }

        Ok(Entity::Hatch(Hatch {
            pattern_name: pattern_name.unwrap_or_default(),
            is_solid: solid_flag.unwrap_or(0) & 0x01 != 0,
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    fn parse_leader(&mut self) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        let mut pending_x: Option<f64> = None;
        let mut vertices: Vec<Point2> = Vec::new();
        while let Some((code, value)) = self.next_field("LEADER")? {
            if common.accept(code, &value) {
                continue;
            }
            match code {
                10 => {
                    if pending_x.is_some() {
                        return Err(DxfError::invalid(
                            "LEADER 顶点 X（组码 10）重复出现且缺少对应的组码 20",
                        ));
                    }
                    pending_x = Some(parse_f64(&value, "LEADER 顶点 X（组码 10）")?);
                }
                20 => {
                    let x = pending_x.take().ok_or_else(|| {
                        DxfError::invalid("LEADER 顶点 Y（组码 20）出现前缺少组码 10")
                    })?;
                    let y = parse_f64(&value, "LEADER 顶点 Y（组码 20）")?;
                    vertices.push(Point2::new(x, y));
                }
                _ => {}
            }
        }

        if pending_x.is_some() {
            return Err(DxfError::invalid(
                "LEADER 读取完毕时缺少最后一个顶点的组码 20",
            ));
        }
        if vertices.is_empty() {
            return Err(DxfError::invalid("LEADER 缺少任意顶点（组码 10/20）"));
        }

        Ok(Entity::Leader(Leader {
            vertices,
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    fn parse_lwpolyline(&mut self) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        let mut is_closed = false;
        let mut vertices: Vec<PolylineVertex> = Vec::new();
        let mut pending_x: Option<f64> = None;
        let mut pending_y: Option<f64> = None;
        while let Some((code, value)) = self.next_field("LWPOLYLINE")? {
            if common.accept(code, &value) {
                continue;
            }
            match code {
                70 => {
                    let flag = parse_i32(&value, "LWPOLYLINE 标志")?;
                    is_closed = flag & 0x01 == 0x01;
                }
                10 => {
                    let x = parse_f64(&value, "LWPOLYLINE 顶点 X")?;
                    if let Some(y) = pending_y.take() {
                        vertices.push(PolylineVertex::new(Point2::new(x, y)));
                    } else if pending_x.replace(x).is_some() {
                        return Err(DxfError::invalid(
                            "LWPOLYLINE 顶点缺少对应的 Y（组码 20）",
                        ));
                    }
                }
                20 => {
                    let y = parse_f64(&value, "LWPOLYLINE 顶点 Y")?;
                    if let Some(x) = pending_x.take() {
                        vertices.push(PolylineVertex::new(Point2::new(x, y)));
                    } else if pending_y.replace(y).is_some() {
                        return Err(DxfError::invalid(
                            "LWPOLYLINE 顶点缺少对应的 X（组码 10）",
                        ));
                    }
                }
                42 => {
                    let bulge = parse_f64(&value, "LWPOLYLINE 顶点 bulge")?;
                    let vertex = vertices.last_mut().ok_or_else(|| {
                        DxfError::invalid("LWPOLYLINE 在定义首个顶点前遇到 bulge（组码 42）")
                    })?;
                    vertex.bulge = bulge;
                }
                _ => {}
            }
        }

        if pending_x.is_some() || pending_y.is_some() {
            return Err(DxfError::invalid(
                "LWPOLYLINE 顶点坐标成对出现（组码 10/20），检测到不完整的顶点",
            ));
        }
        if vertices.is_empty() {
            return Err(DxfError::invalid("LWPOLYLINE 未解析到任何顶点"));
        }

        Ok(Entity::Polyline(Polyline {
            vertices,
            is_closed,
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    fn parse_circle(&mut self) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        let mut radius = None;
        while let Some((code, value)) = self.next_field("CIRCLE")? {
            if common.accept(code, &value) {
                continue;
            }
            match code {
                40 => assign_coord(&mut radius, &value, "CIRCLE 半径（组码 40）")?,
                _ => {}
            }
        }

        let radius = radius.ok_or_else(|| DxfError::invalid("CIRCLE 缺少半径（组码 40）"))?;
        Ok(Entity::Circle(Circle {
            radius,
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    fn parse_other(&mut self, kind: &str) -> Result<Entity, DxfError> {
        let mut common = CommonFields::default();
        while let Some((code, value)) = self.next_field(kind)? {
            common.accept(code, &value);
        }
        Ok(Entity::Other(OtherEntity {
            kind: kind.to_string(),
            handle: common.handle(),
            layer: common.layer(),
        }))
    }

    fn skip_entity_body(&mut self) -> Result<(), DxfError> {
        loop {
            match self.reader.next_pair()? {
                Some((0, value)) => {
                    self.reader.put_back((0, value));
                    break;
                }
                Some(_) => continue,
                None => break,
            }
        }
        Ok(())
    }
}

struct DxfReader<'a> {
    lines: std::str::Lines<'a>,
    buffer: Option<(i32, String)>,
    line_number: usize,
}

impl<'a> DxfReader<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines(),
            buffer: None,
            line_number: 0,
        }
    }

    /// 读取下一组（组码, 值）；注释组码 999 直接跳过。
    fn next_pair(&mut self) -> Result<Option<(i32, String)>, DxfError> {
        if let Some(pair) = self.buffer.take() {
            return Ok(Some(pair));
        }

        loop {
            let code_line = match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    line
                }
                None => return Ok(None),
            };

            let value_line = match self.lines.next() {
                Some(line) => {
                    self.line_number += 1;
                    line
                }
                None => {
                    return Err(DxfError::invalid(format!(
                        "文件在第 {} 行结束，缺少与组码对应的值行",
                        self.line_number
                    )));
                }
            };

            let code = code_line.trim().parse::<i32>().map_err(|_| {
                DxfError::invalid(format!(
                    "第 {} 行的组码 \"{}\" 无法解析为整数",
                    self.line_number - 1,
                    code_line.trim()
                ))
            })?;
            if code == 999 {
                continue;
            }
            let value = value_line.trim_end_matches('\r').to_string();
            return Ok(Some((code, value)));
        }
    }

    fn put_back(&mut self, pair: (i32, String)) {
        debug_assert!(self.buffer.is_none(), "DXF pair 只能回退一次");
        self.buffer = Some(pair);
    }
}

fn assign_coord(slot: &mut Option<f64>, raw: &str, context: &str) -> Result<(), DxfError> {
    if slot.is_some() {
        return Err(DxfError::invalid(format!("{context} 出现重复值")));
    }
    *slot = Some(parse_f64(raw, context)?);
    Ok(())
}

fn parse_f64(raw: &str, context: &str) -> Result<f64, DxfError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i32(raw: &str, context: &str) -> Result<i32, DxfError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| DxfError::invalid(format!("{context} 解析失败（值：\"{raw}\"）")))
}

fn parse_i16(raw: &str, context: &str) -> Result<i16, DxfError> {
    let value = parse_i32(raw, context)?;
    i16::try_from(value)
        .map_err(|_| DxfError::invalid(format!("{context} 超出 i16 范围（值：{value}）")))
}

/// MTEXT 内容转纯文本：去掉字体、高度、颜色等格式码与分组括号，保留换行与堆叠分数。
fn decode_mtext_content(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '{' | '}' => {}
            '\\' => match chars.next() {
                Some('P') => result.push('\n'),
                Some('~') => result.push(' '),
                Some(escaped @ ('\\' | '{' | '}')) => result.push(escaped),
                Some('S') => {
                    for next in chars.by_ref() {
                        match next {
                            ';' => break,
                            '^' | '#' => result.push('/'),
                            other => result.push(other),
                        }
                    }
                }
                Some('U') if chars.peek() == Some(&'+') => {
                    chars.next();
                    let hex: String = chars.by_ref().take(4).collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(decoded) => result.push(decoded),
                        None => {
                            result.push_str("\\U+");
                            result.push_str(&hex);
                        }
                    }
                }
                Some('f' | 'F' | 'H' | 'C' | 'c' | 'A' | 'W' | 'Q' | 'T' | 'p') => {
                    for next in chars.by_ref() {
                        if next == ';' {
                            break;
                        }
                    }
                }
                Some('L' | 'l' | 'O' | 'o' | 'K' | 'k' | 'N') => {}
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            },
            other => result.push(other),
        }
    }
    result
}

/// TEXT/ATTRIB 的单行内容：处理 `%%` 控制码与少量反斜杠转义。
fn decode_inline_text(raw: &str) -> String {
    let mut result = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '%' && chars.peek() == Some(&'%') {
            chars.next();
            match chars.next() {
                Some('d' | 'D') => result.push('°'),
                Some('p' | 'P') => result.push('±'),
                Some('c' | 'C') => result.push('⌀'),
                Some('%') => result.push('%'),
                Some('u' | 'U' | 'o' | 'O' | 'k' | 'K') => {}
                Some(other) => {
                    result.push_str("%%");
                    result.push(other);
                }
                None => result.push_str("%%"),
            }
        } else if ch == '\\' {
            match chars.next() {
                Some('P') | Some('p') => result.push('\n'),
                Some('~') => result.push(' '),
                Some('\\') => result.push('\\'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mtext_formatting_is_stripped() {
        assert_eq!(
            decode_mtext_content(r"{\fArial|b1;\H2.5x;LIVING}\PROOM"),
            "LIVING\nROOM"
        );
        assert_eq!(decode_mtext_content(r"Area \S12^2;"), "Area 12/2");
        assert_eq!(decode_mtext_content(r"A\~B\\C"), r"A B\C");
        assert_eq!(decode_mtext_content(r"\U+00B0C"), "°C");
    }

    #[test]
    fn inline_text_control_codes() {
        assert_eq!(decode_inline_text("90%%d"), "90°");
        assert_eq!(decode_inline_text("%%uBED 1"), "BED 1");
        assert_eq!(decode_inline_text("5%%%"), "5%");
    }

    #[test]
    fn reader_skips_comments_and_reports_bad_codes() {
        let mut reader = DxfReader::new("999\ncomment\n0\nEOF\n");
        assert_eq!(reader.next_pair().unwrap(), Some((0, "EOF".to_string())));
        assert_eq!(reader.next_pair().unwrap(), None);

        let mut broken = DxfReader::new("X\nSECTION\n");
        assert!(broken.next_pair().is_err());
    }

    #[test]
    fn unknown_entities_keep_layer_and_handle() {
        let source = "0\nSECTION\n2\nENTITIES\n0\nLINE\n5\n1A\n8\nBrick-Walls\n10\n0\n20\n0\n11\n5\n21\n0\n0\nENDSEC\n0\nEOF\n";
        let document = parse_document(source).expect("parse");
        let (_, entity) = document.entities().next().expect("one entity");
        assert_eq!(entity.type_name(), "LINE");
        assert_eq!(entity.layer_name(), "Brick-Walls");
        assert_eq!(entity.handle(), "1A");
    }
}
