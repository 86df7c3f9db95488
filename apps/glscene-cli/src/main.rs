use anyhow::Context;
use clap::{Parser, Subcommand};
use glscene_gl::{
    DrawMode, GlCall, GpuResources, Mesh, MeshAttribute, POSITION_ATTRIBUTE, RecordingContext,
    ShaderProgram,
};
use glscene_math::{Quat, Vec3};
use glscene_scene::{NodeId, ProjectionParams, Scene, Transform};
use tracing::info;
use tracing_subscriber::EnvFilter;

const VERTEX_SHADER: &str = "attribute vec3 position;\n\
    uniform mat4 u_viewProjectionMatrix;\n\
    uniform mat4 u_modelMatrix;\n\
    void main() {\n\
        gl_Position = u_viewProjectionMatrix * u_modelMatrix * vec4(position, 1.0);\n\
    }";
const FRAGMENT_SHADER: &str = "precision mediump float;\n\
    uniform float u_brightness;\n\
    void main() { gl_FragColor = vec4(vec3(u_brightness), 1.0); }";

#[derive(Parser)]
#[command(name = "glscene-cli", about = "Headless scene graph driver over a recording GL context")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Build a small hierarchy, run a few frames and summarize the GL calls
    Demo {
        /// Drawing buffer width in pixels
        #[arg(long, default_value = "800")]
        width: u32,
        /// Drawing buffer height in pixels
        #[arg(long, default_value = "600")]
        height: u32,
        /// Number of child triangles orbiting the root
        #[arg(short, long, default_value = "3")]
        children: usize,
        /// Number of update/draw frames
        #[arg(short, long, default_value = "2")]
        frames: u32,
        /// Dump the recorded calls of the last frame as JSON
        #[arg(long)]
        json: bool,
    },
    /// Map a pixel coordinate to world space through a camera
    Pick {
        x: f32,
        y: f32,
        /// Depth of the picked point in camera space
        #[arg(long, default_value = "-1.0", allow_hyphen_values = true)]
        depth: f32,
        #[arg(long, default_value = "800")]
        width: u32,
        #[arg(long, default_value = "600")]
        height: u32,
        /// Camera distance from the origin along +Z
        #[arg(long, default_value = "10.0")]
        distance: f32,
    },
    /// Project a world-space point to pixel coordinates
    Project {
        #[arg(allow_hyphen_values = true)]
        x: f32,
        #[arg(allow_hyphen_values = true)]
        y: f32,
        #[arg(allow_hyphen_values = true)]
        z: f32,
        #[arg(long, default_value = "800")]
        width: u32,
        #[arg(long, default_value = "600")]
        height: u32,
        #[arg(long, default_value = "10.0")]
        distance: f32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("glscene-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("math: {}", glscene_math::crate_info());
            println!("gl: {}", glscene_gl::crate_info());
            println!("scene: {}", glscene_scene::crate_info());
        }
        Commands::Demo {
            width,
            height,
            children,
            frames,
            json,
        } => run_demo(width, height, children, frames, json)?,
        Commands::Pick {
            x,
            y,
            depth,
            width,
            height,
            distance,
        } => {
            let cam = active_camera(width, height, distance)?;
            let world = cam
                .screen_to_world(Vec3::new(x, y, depth))
                .context("camera has no projection")?;
            println!(
                "pixel ({x}, {y}) -> world ({:.4}, {:.4}, {:.4})",
                world.x, world.y, world.z
            );
        }
        Commands::Project {
            x,
            y,
            z,
            width,
            height,
            distance,
        } => {
            let cam = active_camera(width, height, distance)?;
            let screen = cam
                .world_to_screen(Vec3::new(x, y, z))
                .context("camera has no projection")?;
            println!(
                "world ({x}, {y}, {z}) -> pixel ({:.2}, {:.2}) depth {:.4}",
                screen.x, screen.y, screen.z
            );
        }
    }

    Ok(())
}

/// Perspective camera on +Z looking at the origin, sized and refreshed for a
/// `width` x `height` drawing buffer.
fn active_camera(width: u32, height: u32, distance: f32) -> anyhow::Result<Transform> {
    let mut ctx = RecordingContext::with_surface_size(width, height);
    let mut resources = GpuResources::new();
    let mut scene = Scene::new();
    let mut cam = Transform::camera(ProjectionParams::default());
    cam.set_position(Vec3::new(0.0, 0.0, distance));
    let id = scene.spawn(cam);
    scene.update(&resources);

    let cam = scene.graph.get_mut(id).context("camera node missing")?;
    cam.set_active(&mut ctx, &mut resources);
    Ok(std::mem::take(cam))
}

fn run_demo(width: u32, height: u32, children: usize, frames: u32, json: bool) -> anyhow::Result<()> {
    let mut ctx = RecordingContext::with_surface_size(width, height);
    let mut resources = GpuResources::new();
    let mut scene = Scene::new();

    let triangle = resources.add_mesh(
        Mesh::new(vec![MeshAttribute::new(
            POSITION_ATTRIBUTE,
            vec![-0.5f32, -0.5, 0.0, 0.5, -0.5, 0.0, 0.0, 0.5, 0.0],
        )])
        .with_draw_mode(DrawMode::Triangles),
    );
    let program = resources.add_program(
        ShaderProgram::new(VERTEX_SHADER, FRAGMENT_SHADER).with_uniform("u_brightness", 1.0f32),
    );
    let mesh = resources.mesh(triangle).context("triangle mesh missing")?;

    let mut cam = Transform::camera(ProjectionParams::default());
    cam.set_position(Vec3::new(0.0, 0.0, 8.0));
    scene.spawn(cam);

    let mut root = Transform::with_mesh(triangle, mesh, program);
    root.set_on_update(|node| node.rotate_y(0.1));
    let root = scene.spawn(root);

    let mut child_ids: Vec<NodeId> = Vec::with_capacity(children);
    for i in 0..children {
        let angle = i as f32 / children.max(1) as f32 * std::f32::consts::TAU;
        let mut child = Transform::with_mesh(triangle, mesh, program);
        child.set_position(Vec3::new(angle.cos() * 3.0, 0.0, angle.sin() * 3.0));
        child.set_rotation(Quat::from_axis_angle(Vec3::Z, angle));
        child.set_scale(Vec3::ONE * 0.5);
        child.set_uniform("u_brightness", 0.5f32 + 0.5 * (i as f32 / children.max(1) as f32));
        let id = scene.spawn(child);
        scene.graph.add_child(root, id);
        child_ids.push(id);
    }

    for frame in 0..frames {
        ctx.clear_calls();
        scene.update(&resources);
        scene.draw(&mut ctx, &mut resources, None)?;
        let draws = ctx.count(|c| matches!(c, GlCall::DrawArrays { .. }));
        info!(frame, calls = ctx.calls().len(), draws, "frame drawn");
    }

    if let Some(node) = scene.graph.get(root) {
        let b = node.bounds();
        println!(
            "root bounds: min ({:.2}, {:.2}, {:.2}) max ({:.2}, {:.2}, {:.2}) radius {:.2}",
            b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z, b.radius
        );
    }
    for id in &child_ids {
        if let Some(node) = scene.graph.get(*id) {
            let t = node.local_to_world().translation();
            println!("{id}: world ({:.2}, {:.2}, {:.2})", t.x, t.y, t.z);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(ctx.calls())?);
    } else {
        println!(
            "last frame: {} calls, {} draws",
            ctx.calls().len(),
            ctx.count(|c| matches!(c, GlCall::DrawArrays { .. }))
        );
    }

    resources.dispose_all(&mut ctx);
    Ok(())
}
