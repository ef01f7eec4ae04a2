//! Mesh ownership and lifecycle against the headless GL model

use std::rc::Rc;

use gl_engine::render::gl::{GlApi, GlContext, HeadlessGl};
use gl_engine::render::{Mesh, Vertex};

fn headless() -> (Rc<HeadlessGl>, Rc<GlContext>) {
    let gl = Rc::new(HeadlessGl::new());
    let ctx = GlContext::new(Rc::clone(&gl));
    (gl, ctx)
}

fn quad_data() -> (Vec<Vertex>, Vec<u32>) {
    (
        vec![
            Vertex::from_position(-0.5, -0.5, 0.0),
            Vertex::from_position(0.5, -0.5, 0.0),
            Vertex::from_position(0.5, 0.5, 0.0),
            Vertex::from_position(-0.5, 0.5, 0.0),
        ],
        vec![0, 1, 2, 0, 2, 3],
    )
}

#[test]
fn test_build_creates_all_handles() {
    let (gl, ctx) = headless();
    let (vertices, indices) = quad_data();
    let mut mesh = Mesh::new(ctx);
    mesh.build(vertices, indices).unwrap();

    assert!(mesh.vertex_array().is_some());
    assert!(mesh.vertex_buffer().is_some());
    assert!(mesh.index_buffer().is_some());
    assert_eq!(mesh.vertices().len(), 4);
    assert_eq!(mesh.indices().len(), 6);
    assert_eq!(mesh.index_count(), 6);
    assert!(gl.is_vertex_array(mesh.vertex_array().raw()));
}

#[test]
fn test_clear_twice_is_harmless() {
    let (gl, ctx) = headless();
    let (vertices, indices) = quad_data();
    let mut mesh = Mesh::from_data(ctx, vertices, indices).unwrap();

    mesh.clear();
    mesh.clear();

    assert!(!mesh.is_built());
    assert!(mesh.vertices().is_empty());
    assert!(mesh.indices().is_empty());
    assert_eq!(gl.live_object_count(), 0);
    assert_eq!(gl.get_error(), glow::NO_ERROR);
}

#[test]
fn test_build_after_clear_is_valid() {
    let (gl, ctx) = headless();
    let (vertices, indices) = quad_data();
    let mut mesh = Mesh::from_data(ctx, vertices.clone(), indices.clone()).unwrap();
    mesh.clear();
    mesh.build(vertices, indices).unwrap();

    assert!(mesh.is_built());
    mesh.render();
    assert_eq!(gl.draw_calls().len(), 1);
}

#[test]
fn test_repeated_build_keeps_object_count_constant() {
    let (gl, ctx) = headless();
    let mut mesh = Mesh::new(ctx);
    for _ in 0..5 {
        let (vertices, indices) = quad_data();
        mesh.build(vertices, indices).unwrap();
        assert_eq!(gl.live_object_count(), 3);
    }
}

#[test]
fn test_take_transfers_ownership() {
    let (gl, ctx) = headless();
    let (vertices, indices) = quad_data();
    let mut source = Mesh::from_data(ctx, vertices, indices).unwrap();
    let vao = source.vertex_array();

    let destination = source.take();

    assert!(!source.is_built());
    assert!(source.vertices().is_empty());
    assert_eq!(destination.vertex_array(), vao);

    drop(source);
    assert!(gl.is_vertex_array(vao.raw()));
    assert!(gl.is_buffer(destination.vertex_buffer().raw()));
    assert!(gl.is_buffer(destination.index_buffer().raw()));

    drop(destination);
    assert_eq!(gl.live_object_count(), 0);
}

#[test]
fn test_moved_mesh_is_released_once() {
    let (gl, ctx) = headless();
    let (vertices, indices) = quad_data();
    let meshes: Vec<Mesh> = vec![Mesh::from_data(Rc::clone(&ctx), vertices, indices).unwrap()];
    let moved = meshes;
    assert_eq!(gl.live_object_count(), 3);
    drop(moved);
    assert_eq!(gl.live_object_count(), 0);
}

#[test]
fn test_quad_draws_six_indices_as_triangles() {
    let (gl, ctx) = headless();
    let quad = Mesh::quad(ctx).unwrap();
    quad.render();

    let draws = gl.draw_calls();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].mode, glow::TRIANGLES);
    assert_eq!(draws[0].count, 6);
    assert_eq!(draws[0].element_type, glow::UNSIGNED_INT);
    assert_eq!(draws[0].offset, 0);
}

#[test]
fn test_quad_index_buffer_contents() {
    let (gl, ctx) = headless();
    let quad = Mesh::quad(ctx).unwrap();

    let (bytes, _usage) = gl.buffer_contents(quad.index_buffer().raw()).unwrap();
    let indices: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    assert_eq!(indices, [0, 1, 2, 0, 2, 3]);
}
