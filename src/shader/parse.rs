// Copyright © 2026 the uberbsp developers
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::collections::HashMap;

use crate::shader::{
    AlphaFunc, BlendFactor, CullMode, Deform, DepthFunc, Shader, ShaderFlags, Sort, Stage, TcMod,
    Waveform,
};

use failure::Error;

/// Parses a whole shader-script file into a map keyed by shader name.
///
/// Later shaders with the same name overwrite earlier ones, and an unclosed
/// shader at end of input is still registered. A structural error (stray
/// content between shaders, unmatched closing brace) fails the whole file;
/// no partial map is returned.
pub fn parse(text: &str) -> Result<HashMap<String, Shader>, Error> {
    let mut parser = Parser {
        depth: 0,
        shader: None,
        stage: None,
        shaders: HashMap::new(),
    };

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        parser.line(line)?;
    }

    Ok(parser.finish())
}

/// Line-oriented parser state. `depth` 0 is between shaders, 1 inside a
/// shader body, 2 inside a stage body.
struct Parser {
    depth: u32,
    shader: Option<Shader>,
    stage: Option<Stage>,
    shaders: HashMap<String, Shader>,
}

impl Parser {
    fn line(&mut self, line: &str) -> Result<(), Error> {
        if line.starts_with('{') {
            self.open_block()?;
            // Shipped scripts put content on the brace line; treat the
            // remainder as the first line of the new block.
            let rest = line[1..].trim();
            if !rest.is_empty() {
                self.line(rest)?;
            }
            return Ok(());
        }

        if line == "}" {
            return self.close_block();
        }

        match self.depth {
            0 => self.begin_shader(line),
            1 => match self.shader.as_mut() {
                Some(shader) => {
                    shader_line(shader, line);
                    Ok(())
                }
                None => bail!("Shader parameter outside of a shader block: {:?}", line),
            },
            2 => match self.stage.as_mut() {
                Some(stage) => {
                    stage_line(stage, line);
                    Ok(())
                }
                None => bail!("Stage parameter without an open stage: {:?}", line),
            },
            _ => bail!("Shader script nested too deeply"),
        }
    }

    fn begin_shader(&mut self, line: &str) -> Result<(), Error> {
        match self.shader {
            Some(ref open) => bail!(
                "Expected a block after shader name {:?}, got {:?}",
                open.name,
                line
            ),
            None => {
                self.shader = Some(Shader::new(line.to_string()));
                Ok(())
            }
        }
    }

    fn open_block(&mut self) -> Result<(), Error> {
        match self.depth {
            0 => {
                ensure!(self.shader.is_some(), "Block opened without a shader name");
                self.depth = 1;
            }
            1 => {
                self.stage = Some(Stage::new());
                self.depth = 2;
            }
            // A sibling stage whose predecessor lost its closing brace to a
            // comment; close the previous stage and start the next one.
            _ => {
                self.close_stage();
                self.stage = Some(Stage::new());
            }
        }
        Ok(())
    }

    fn close_block(&mut self) -> Result<(), Error> {
        match self.depth {
            2 => {
                self.close_stage();
                self.depth = 1;
            }
            1 => {
                match self.shader.take() {
                    Some(shader) => {
                        self.shaders.insert(shader.name.clone(), shader);
                    }
                    None => bail!("Closing brace without an open shader"),
                }
                self.depth = 0;
            }
            _ => bail!("Unmatched closing brace"),
        }
        Ok(())
    }

    /// Closes the open stage into the open shader. A stage whose blend ends
    /// up as the pass-through pair is effectively opaque: the blend flag is
    /// cleared and depth writes come back on.
    fn close_stage(&mut self) {
        if let Some(mut stage) = self.stage.take() {
            if stage.blend_src == BlendFactor::One && stage.blend_dst == BlendFactor::Zero {
                stage.has_blend_func = false;
                stage.depth_write = true;
            }
            if let Some(ref mut shader) = self.shader {
                shader.stages.push(stage);
            }
        }
    }

    fn finish(mut self) -> HashMap<String, Shader> {
        // Some shipped scripts end mid-shader; register what we have.
        self.close_stage();
        if let Some(shader) = self.shader.take() {
            self.shaders.insert(shader.name.clone(), shader);
        }
        self.shaders
    }
}

type ShaderHandler = fn(&mut Shader, &[&str]);
type StageHandler = fn(&mut Stage, &[&str]);

lazy_static! {
    static ref SHADER_KEYWORDS: HashMap<&'static str, ShaderHandler> = {
        let mut m = HashMap::new();
        m.insert("cull", shader_cull as ShaderHandler);
        m.insert("sort", shader_sort);
        m.insert("surfaceparm", shader_surfaceparm);
        m.insert("deformvertexes", shader_deformvertexes);
        m.insert("nopicmip", shader_nopicmip);
        m.insert("nomipmap", shader_nomipmap);
        m.insert("nomipmaps", shader_nomipmap);
        m.insert("portal", shader_portal);
        m.insert("portalsky", shader_portalsky);
        m.insert("nofog", shader_nofog);
        m.insert("nocompress", shader_nocompress);
        m.insert("allowcompress", shader_allowcompress);
        m.insert("entitymergable", shader_entitymergable);
        m.insert("polygonoffset", shader_polygonoffset);
        m
    };
    static ref STAGE_KEYWORDS: HashMap<&'static str, StageHandler> = {
        let mut m = HashMap::new();
        m.insert("map", stage_map as StageHandler);
        m.insert("mapcomp", stage_map);
        m.insert("clampmap", stage_clampmap);
        m.insert("animmap", stage_animmap);
        m.insert("animmapcomp", stage_animmap);
        m.insert("blendfunc", stage_blendfunc);
        m.insert("alphafunc", stage_alphafunc);
        m.insert("alphatest", stage_alphatest);
        m.insert("alphagen", stage_alphagen);
        m.insert("rgbgen", stage_rgbgen);
        m.insert("tcgen", stage_tcgen);
        m.insert("tcmod", stage_tcmod);
        m.insert("depthfunc", stage_depthfunc);
        m.insert("depthwrite", stage_depthwrite);
        m.insert("nodepthtest", stage_nodepthtest);
        m.insert("detail", stage_detail);
        m
    };
}

// Keywords consumed by the map compiler or the level editor; recognized so
// they don't pollute the raw-parameter list, otherwise meaningless here.
fn editor_keyword(keyword: &str) -> bool {
    keyword.starts_with("qer_")
        || keyword.starts_with("q3map_")
        || keyword == "tesssize"
        || keyword == "surfacelight"
        || keyword == "cloudparms"
}

fn shader_line(shader: &mut Shader, line: &str) {
    let mut tokens = line.split_whitespace();
    let keyword = match tokens.next() {
        Some(k) => k.to_lowercase(),
        None => return,
    };
    if editor_keyword(&keyword) {
        return;
    }

    let args: Vec<&str> = tokens.collect();
    match SHADER_KEYWORDS.get(keyword.as_str()) {
        Some(handler) => handler(shader, &args),
        None => shader.raw_params.push(line.to_string()),
    }
}

fn stage_line(stage: &mut Stage, line: &str) {
    let mut tokens = line.split_whitespace();
    let keyword = match tokens.next() {
        Some(k) => k.to_lowercase(),
        None => return,
    };

    let args: Vec<&str> = tokens.collect();
    match STAGE_KEYWORDS.get(keyword.as_str()) {
        Some(handler) => handler(stage, &args),
        None => stage.raw_lines.push(line.to_string()),
    }
}

/// A waveform is exactly five tokens: function name plus base, amplitude,
/// phase and frequency. Anything else fails locally; callers fall back to a
/// neutral generation mode instead of aborting the file.
fn parse_waveform(tokens: &[&str]) -> Option<Waveform> {
    if tokens.len() != 5 {
        return None;
    }

    Some(Waveform {
        func: tokens[0].to_lowercase(),
        base: tokens[1].parse().ok()?,
        amplitude: tokens[2].parse().ok()?,
        phase: tokens[3].parse().ok()?,
        frequency: tokens[4].parse().ok()?,
    })
}

fn float_arg(args: &[&str], index: usize, default: f32) -> f32 {
    args.get(index)
        .and_then(|tok| tok.parse().ok())
        .unwrap_or(default)
}

fn shader_cull(shader: &mut Shader, args: &[&str]) {
    let mode = args.first().map(|t| t.to_lowercase()).unwrap_or_default();
    shader.cull = match mode.as_str() {
        "none" | "disable" | "twosided" => CullMode::None,
        "back" | "backside" | "backsided" => CullMode::Back,
        _ => CullMode::Front,
    };
}

fn shader_sort(shader: &mut Shader, args: &[&str]) {
    if let Some(token) = args.first() {
        shader.sort = Sort::from_token(token);
    }
}

fn shader_surfaceparm(shader: &mut Shader, args: &[&str]) {
    if let Some(parm) = args.first() {
        let parm = parm.to_lowercase();
        if parm == "sky" {
            shader.flags |= ShaderFlags::SKY;
        }
        shader.surface_parms.insert(parm);
    }
}

fn shader_deformvertexes(shader: &mut Shader, args: &[&str]) {
    // Only the wave form carries data we interpret; the div argument is
    // stored as its reciprocal (texels per wave cycle).
    if args.first().map(|t| t.to_lowercase()) != Some("wave".to_string()) {
        return;
    }
    let divisor = match args.get(1).and_then(|t| t.parse::<f32>().ok()) {
        Some(d) => d,
        None => return,
    };
    if let Some(waveform) = parse_waveform(&args[2..]) {
        shader.deforms.push(Deform::Wave {
            spread: 1.0 / divisor,
            waveform,
        });
    }
}

fn shader_nopicmip(shader: &mut Shader, _args: &[&str]) {
    shader.flags |= ShaderFlags::NO_PICMIP;
}

fn shader_nomipmap(shader: &mut Shader, _args: &[&str]) {
    shader.flags |= ShaderFlags::NO_MIPMAP;
}

fn shader_portal(shader: &mut Shader, _args: &[&str]) {
    shader.flags |= ShaderFlags::PORTAL;
}

fn shader_portalsky(shader: &mut Shader, _args: &[&str]) {
    shader.flags |= ShaderFlags::PORTAL_SKY;
}

fn shader_nofog(shader: &mut Shader, _args: &[&str]) {
    shader.flags |= ShaderFlags::NO_FOG;
}

fn shader_nocompress(shader: &mut Shader, _args: &[&str]) {
    shader.flags |= ShaderFlags::NO_COMPRESS;
}

fn shader_allowcompress(shader: &mut Shader, _args: &[&str]) {
    shader.flags -= ShaderFlags::NO_COMPRESS;
}

fn shader_entitymergable(shader: &mut Shader, _args: &[&str]) {
    shader.flags |= ShaderFlags::ENTITY_MERGABLE;
}

fn shader_polygonoffset(shader: &mut Shader, _args: &[&str]) {
    shader.flags |= ShaderFlags::POLYGON_OFFSET;
}

fn stage_map(stage: &mut Stage, args: &[&str]) {
    if let Some(map) = args.first() {
        stage.map = Some(map.to_string());
    }
}

fn stage_clampmap(stage: &mut Stage, args: &[&str]) {
    stage_map(stage, args);
    stage.clamp = true;
}

fn stage_animmap(stage: &mut Stage, args: &[&str]) {
    if args.is_empty() {
        return;
    }
    stage.map = Some("anim".to_string());
    stage.anim_frequency = float_arg(args, 0, 0.0);
    stage.anim_maps = args[1..].iter().map(|m| m.to_string()).collect();
}

fn stage_blendfunc(stage: &mut Stage, args: &[&str]) {
    let src = match args.first() {
        Some(t) => t.to_lowercase(),
        None => return,
    };

    match src.as_str() {
        "add" => {
            stage.blend_src = BlendFactor::One;
            stage.blend_dst = BlendFactor::One;
        }
        "filter" => {
            stage.blend_src = BlendFactor::DstColor;
            stage.blend_dst = BlendFactor::Zero;
        }
        "blend" => {
            stage.blend_src = BlendFactor::SrcAlpha;
            stage.blend_dst = BlendFactor::OneMinusSrcAlpha;
        }
        _ => {
            stage.blend_src = BlendFactor::from_token(&src);
            stage.blend_dst = match args.get(1) {
                Some(dst) => BlendFactor::from_token(dst),
                None => {
                    warn!("blendFunc missing destination factor");
                    BlendFactor::One
                }
            };
        }
    }

    stage.has_blend_func = true;
    if !stage.depth_write_override {
        stage.depth_write = false;
    }
}

fn stage_alphafunc(stage: &mut Stage, args: &[&str]) {
    let func = args.first().map(|t| t.to_uppercase()).unwrap_or_default();
    stage.alpha_func = match func.as_str() {
        "GT0" => Some(AlphaFunc::Gt0),
        "LT128" => Some(AlphaFunc::Lt128),
        "GE128" => Some(AlphaFunc::Ge128),
        other => {
            warn!("Unknown alphaFunc {:?}", other);
            None
        }
    };
}

fn stage_alphatest(stage: &mut Stage, args: &[&str]) {
    if let Some(threshold) = args.first().and_then(|t| t.parse().ok()) {
        stage.alpha_func = Some(AlphaFunc::Threshold(threshold));
    }
}

fn stage_rgbgen(stage: &mut Stage, args: &[&str]) {
    let gen = match args.first() {
        Some(t) => t.to_lowercase(),
        None => return,
    };

    if gen == "wave" {
        match parse_waveform(&args[1..]) {
            Some(waveform) => {
                stage.rgb_gen = gen;
                stage.rgb_waveform = Some(waveform);
            }
            None => stage.rgb_gen = "identity".to_string(),
        }
    } else {
        stage.rgb_gen = gen;
    }
}

fn stage_alphagen(stage: &mut Stage, args: &[&str]) {
    let gen = match args.first() {
        Some(t) => t.to_lowercase(),
        None => return,
    };

    if gen == "wave" {
        match parse_waveform(&args[1..]) {
            Some(waveform) => {
                stage.alpha_gen = gen;
                stage.alpha_waveform = Some(waveform);
            }
            None => stage.alpha_gen = "base".to_string(),
        }
    } else {
        stage.alpha_gen = gen;
    }
}

fn stage_tcgen(stage: &mut Stage, args: &[&str]) {
    if let Some(gen) = args.first() {
        stage.tc_gen = gen.to_lowercase();
    }
}

fn stage_tcmod(stage: &mut Stage, args: &[&str]) {
    let kind = match args.first() {
        Some(t) => t.to_lowercase(),
        None => return,
    };

    match kind.as_str() {
        "rotate" => stage.tc_mods.push(TcMod::Rotate {
            degrees_per_second: float_arg(args, 1, 0.0),
        }),
        "scale" => stage.tc_mods.push(TcMod::Scale {
            s: float_arg(args, 1, 1.0),
            t: float_arg(args, 2, 1.0),
        }),
        "scroll" => stage.tc_mods.push(TcMod::Scroll {
            s: float_arg(args, 1, 0.0),
            t: float_arg(args, 2, 0.0),
        }),
        "stretch" => match parse_waveform(&args[1..]) {
            Some(waveform) => stage.tc_mods.push(TcMod::Stretch { waveform }),
            None => warn!("Dropping tcMod stretch with a bad waveform"),
        },
        "turb" => stage.tc_mods.push(TcMod::Turb {
            base: float_arg(args, 1, 0.0),
            amplitude: float_arg(args, 2, 0.0),
            phase: float_arg(args, 3, 0.0),
            frequency: float_arg(args, 4, 0.0),
        }),
        other => warn!("Unknown tcMod {:?}", other),
    }
}

fn stage_depthfunc(stage: &mut Stage, args: &[&str]) {
    let func = args.first().map(|t| t.to_lowercase()).unwrap_or_default();
    stage.depth_func = match func.as_str() {
        "equal" => DepthFunc::Equal,
        "lequal" => DepthFunc::LessEqual,
        other => {
            warn!("Unknown depthFunc {:?}", other);
            DepthFunc::LessEqual
        }
    };
}

fn stage_depthwrite(stage: &mut Stage, _args: &[&str]) {
    stage.depth_write = true;
    stage.depth_write_override = true;
}

fn stage_nodepthtest(stage: &mut Stage, _args: &[&str]) {
    stage.depth_func = DepthFunc::Always;
}

fn stage_detail(stage: &mut Stage, _args: &[&str]) {
    stage.detail = true;
}
