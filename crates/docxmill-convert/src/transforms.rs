//! Rewriting and querying the document tree

use crate::document::{Document, Element, ElementType, Paragraph, Run};

/// Apply `transform` to every element of the body, children before parents
pub fn transform_elements<F>(mut document: Document, mut transform: F) -> Document
where
    F: FnMut(Element) -> Element,
{
    document.children = document
        .children
        .into_iter()
        .map(|element| transform_element(element, &mut transform))
        .collect();
    document
}

fn transform_element<F>(mut element: Element, transform: &mut F) -> Element
where
    F: FnMut(Element) -> Element,
{
    if let Some(children) = element.children_mut() {
        let taken = std::mem::take(children);
        *children = taken
            .into_iter()
            .map(|child| transform_element(child, transform))
            .collect();
    }
    transform(element)
}

/// Apply `transform` to every paragraph
pub fn transform_paragraphs<F>(document: Document, mut transform: F) -> Document
where
    F: FnMut(Paragraph) -> Paragraph,
{
    transform_elements(document, |element| match element {
        Element::Paragraph(paragraph) => Element::Paragraph(transform(paragraph)),
        other => other,
    })
}

/// Apply `transform` to every run
pub fn transform_runs<F>(document: Document, mut transform: F) -> Document
where
    F: FnMut(Run) -> Run,
{
    transform_elements(document, |element| match element {
        Element::Run(run) => Element::Run(transform(run)),
        other => other,
    })
}

/// All descendants of `elements`, depth first
pub fn descendants(elements: &[Element]) -> Vec<&Element> {
    let mut found = Vec::new();
    collect_descendants(elements, &mut found);
    found
}

fn collect_descendants<'a>(elements: &'a [Element], found: &mut Vec<&'a Element>) {
    for element in elements {
        found.push(element);
        collect_descendants(element.children(), found);
    }
}

/// Descendants of `elements` with the given type
pub fn descendants_of_type(elements: &[Element], element_type: ElementType) -> Vec<&Element> {
    descendants(elements)
        .into_iter()
        .filter(|e| e.element_type() == element_type)
        .collect()
}
