// src/loader/tmx_loader.rs
use crate::document::*;
use crate::error::MapError;
use crate::loader::tile_data::decode_layer_data;
use crate::loader::xml::{parse_tree, Element};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

fn properties_from_xml(el: &Element) -> Properties {
    let mut out = Properties::new();
    for prop in el.children.iter().filter(|c| c.name == "property") {
        let Some(name) = prop.attr("name") else {
            debug!("skipping <property> without a name");
            continue;
        };
        // Multi-line string properties carry their value as element text.
        let value = prop.attr("value").unwrap_or(prop.text.as_str());
        out.insert(name, value);
    }
    out
}

fn tileset_from_xml(el: &Element) -> Result<Tileset, MapError> {
    if el.attr("source").is_some() {
        return Err(MapError::UnsupportedFormat(format!(
            "external tileset '{}'; embed it in the map",
            el.attr("source").unwrap_or_default()
        )));
    }

    let mut tileset = Tileset {
        name: el.attr("name").unwrap_or_default().to_owned(),
        first_tile_id: el.parse_required("firstgid")?,
        tile_width: el.parse_required("tilewidth")?,
        tile_height: el.parse_required("tileheight")?,
        margin: el.parse_or("margin", 0)?,
        spacing: el.parse_or("spacing", 0)?,
        ..Default::default()
    };

    for child in &el.children {
        match child.name.as_str() {
            "image" => tileset.image_filename = child.required("source")?.to_owned(),
            "properties" => tileset.properties = properties_from_xml(child),
            other => debug!(tileset = %tileset.name, "skipping <{other}> in tileset"),
        }
    }

    if tileset.image_filename.is_empty() {
        return Err(MapError::MissingAttribute {
            element: "image".into(),
            attribute: "source".into(),
        });
    }
    Ok(tileset)
}

fn oversized(element: &str, width: u32, height: u32) -> MapError {
    MapError::InvalidAttribute {
        element: element.into(),
        attribute: "width".into(),
        value: format!("{width}x{height} tiles is too large"),
    }
}

fn layer_from_xml(el: &Element, doc: &TiledDocument) -> Result<TileLayer, MapError> {
    let name = el.attr("name").unwrap_or_default().to_owned();
    let width: u32 = el.parse_or("width", doc.width)?;
    let height: u32 = el.parse_or("height", doc.height)?;
    let mut layer = TileLayer {
        name,
        width,
        height,
        opacity: el.parse_or("opacity", 1.0)?,
        visible: el.flag_or("visible", true)?,
        ..Default::default()
    };
    let cells = layer
        .cell_count()
        .filter(|_| layer.pixel_size(doc.tile_width, doc.tile_height).is_some())
        .ok_or_else(|| oversized("layer", width, height))?;

    let mut saw_data = false;
    for child in &el.children {
        match child.name.as_str() {
            "data" => {
                let (ids, flips) = decode_layer_data(
                    &layer.name,
                    child.attr("encoding"),
                    child.attr("compression"),
                    &child.text,
                    cells,
                )?;
                layer.tile_indices = ids;
                layer.flip_flags = flips;
                saw_data = true;
            }
            "properties" => layer.properties = properties_from_xml(child),
            other => debug!(layer = %layer.name, "skipping <{other}> in layer"),
        }
    }

    if !saw_data {
        return Err(MapError::LayerSize {
            layer: layer.name,
            expected: cells,
            actual: 0,
        });
    }
    Ok(layer)
}

fn object_from_xml(el: &Element) -> Result<TiledObject, MapError> {
    let kind = el
        .attr("type")
        .or_else(|| el.attr("class"))
        .unwrap_or_default()
        .to_owned();

    let mut obj = TiledObject {
        id: el.parse_or("id", 0)?,
        name: el.attr("name").unwrap_or_default().to_owned(),
        kind,
        x: el.parse_or("x", 0.0)?,
        y: el.parse_or("y", 0.0)?,
        width: el.parse_or("width", 0.0)?,
        height: el.parse_or("height", 0.0)?,
        rotation: el.parse_or("rotation", 0.0)?,
        visible: el.flag_or("visible", true)?,
        properties: Properties::new(),
    };

    for child in &el.children {
        match child.name.as_str() {
            "properties" => obj.properties = properties_from_xml(child),
            // Shape markers don't change how we read the bounds.
            "point" | "ellipse" | "polygon" | "polyline" | "text" => {}
            other => debug!(object = obj.label(), "skipping <{other}> in object"),
        }
    }
    Ok(obj)
}

fn object_group_from_xml(el: &Element) -> Result<ObjectGroup, MapError> {
    let mut group = ObjectGroup {
        name: el.attr("name").unwrap_or_default().to_owned(),
        ..Default::default()
    };
    for child in &el.children {
        match child.name.as_str() {
            "object" => group.objects.push(object_from_xml(child)?),
            "properties" => group.properties = properties_from_xml(child),
            other => debug!(group = %group.name, "skipping <{other}> in object group"),
        }
    }
    Ok(group)
}

/// Parse TMX XML text into a [`TiledDocument`].
pub fn parse_tmx_str(xml: &str) -> Result<TiledDocument, MapError> {
    let root = parse_tree(xml)?;
    if root.name != "map" {
        return Err(MapError::MalformedXml {
            context: format!("root element is <{}>, expected <map>", root.name),
        });
    }

    if let Some(orientation) = root.attr("orientation") {
        if orientation != "orthogonal" {
            return Err(MapError::UnsupportedFormat(format!(
                "{orientation} orientation"
            )));
        }
    }
    if root.flag_or("infinite", false)? {
        return Err(MapError::UnsupportedFormat("infinite (chunked) map".into()));
    }

    let mut doc = TiledDocument {
        width: root.parse_required("width")?,
        height: root.parse_required("height")?,
        tile_width: root.parse_required("tilewidth")?,
        tile_height: root.parse_required("tileheight")?,
        ..Default::default()
    };
    if doc.pixel_size().is_none() {
        return Err(oversized("map", doc.width, doc.height));
    }

    for child in &root.children {
        match child.name.as_str() {
            "tileset" => doc.tilesets.push(tileset_from_xml(child)?),
            "layer" => {
                let layer = layer_from_xml(child, &doc)?;
                doc.layers.push(layer);
            }
            "objectgroup" => doc.object_groups.push(object_group_from_xml(child)?),
            "properties" => doc.properties = properties_from_xml(child),
            other => debug!("skipping unhandled element <{other}>"),
        }
    }

    info!(
        width = doc.width,
        height = doc.height,
        tilesets = doc.tilesets.len(),
        layers = doc.layers.len(),
        object_groups = doc.object_groups.len(),
        "parsed TMX map"
    );
    Ok(doc)
}

/// Read and parse a `.tmx` file. Returns the document and the map's directory,
/// which image paths are relative to.
pub fn parse_tmx_file(path: impl AsRef<Path>) -> Result<(TiledDocument, PathBuf), MapError> {
    let p = path.as_ref();
    if p.extension().and_then(|e| e.to_str()) != Some("tmx") {
        return Err(MapError::UnsupportedFormat(format!(
            "map file must be a .tmx file: {}",
            p.display()
        )));
    }

    let txt = std::fs::read_to_string(p).map_err(|source| MapError::Io {
        path: p.to_path_buf(),
        source,
    })?;
    let doc = parse_tmx_str(&txt)?;

    let map_dir = p
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./"));
    Ok((doc, map_dir))
}
